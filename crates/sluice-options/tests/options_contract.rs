use std::sync::{Arc, Mutex};

use sluice_options::{
    Field, FieldEvent, MultiOptionsManager, OptionStore, OptionValue, OptionsEvent, OptionsManager,
};

#[derive(Default)]
struct FormField {
    value: Mutex<Option<OptionValue>>,
    writes: Mutex<Vec<OptionValue>>,
}

impl FormField {
    fn writes(&self) -> Vec<OptionValue> {
        self.writes.lock().expect("writes").clone()
    }
}

impl Field for FormField {
    fn value(&self) -> OptionValue {
        self.value
            .lock()
            .expect("value")
            .clone()
            .unwrap_or_else(|| OptionValue::from(""))
    }

    fn set_value(&self, value: &OptionValue) {
        *self.value.lock().expect("value") = Some(value.clone());
        self.writes.lock().expect("writes").push(value.clone());
    }
}

fn preferences() -> OptionsManager {
    OptionsManager::with_options([
        ("max_upload_speed", OptionValue::Number(-1.0)),
        ("max_connections_global", OptionValue::Number(200.0)),
        ("dht", OptionValue::Bool(true)),
        ("download_location", OptionValue::from("/downloads")),
    ])
}

#[test]
fn editing_back_to_the_default_clears_the_dirty_flag() {
    let mut manager = OptionsManager::with_options([("max_upload_speed", -1)]);
    let field = Arc::new(FormField::default());
    manager.bind("max_upload_speed", field.clone());

    manager
        .update("max_upload_speed", 50.into())
        .expect("registered");
    assert_eq!(manager.get("max_upload_speed"), Some(OptionValue::Number(50.0)));
    assert!(manager.is_dirty("max_upload_speed"));

    manager
        .update("max_upload_speed", (-1).into())
        .expect("registered");
    assert_eq!(manager.get("max_upload_speed"), Some(OptionValue::Number(-1.0)));
    assert!(!manager.is_dirty("max_upload_speed"));
    assert_eq!(field.writes().last(), Some(&OptionValue::Number(-1.0)));
}

#[test]
fn dirty_state_tracks_the_coerced_value() {
    let mut manager = preferences();
    let cases = [
        ("max_connections_global", OptionValue::from("200"), false),
        ("max_connections_global", OptionValue::from("250"), true),
        ("dht", OptionValue::from("on"), false),
        ("dht", OptionValue::Number(0.0), true),
        ("download_location", OptionValue::from("/downloads"), false),
        ("download_location", OptionValue::from("/srv"), true),
    ];

    for (option, value, dirty) in cases {
        manager.update(option, value.clone()).expect("registered");
        assert_eq!(manager.is_dirty(option), dirty, "{option} <- {value}");
        if dirty {
            let expected = sluice_options::coerce(
                manager.get_default(option).expect("default").kind(),
                &value,
            )
            .expect("coercible");
            assert_eq!(manager.get(option), Some(expected));
        }
    }
}

#[test]
fn commit_leaves_nothing_dirty() {
    let mut manager = preferences();
    manager
        .update_many([
            ("max_upload_speed".to_string(), OptionValue::Number(80.0)),
            ("dht".to_string(), OptionValue::Bool(false)),
        ])
        .expect("registered");

    let dirty = manager.get_dirty();
    manager.commit();

    assert!(manager.get_dirty().is_empty());
    for option in dirty.keys() {
        assert_eq!(manager.get(option), manager.get_default(option));
    }
}

#[test]
fn reset_leaves_the_registry_usable() {
    let mut manager = preferences();
    manager
        .update("download_location", "/tmp".into())
        .expect("registered");
    manager.reset();
    assert_eq!(
        manager.get("download_location"),
        manager.get_default("download_location")
    );

    manager.set("download_location", "/data");
    assert_eq!(
        manager.get("download_location"),
        Some(OptionValue::from("/data"))
    );
}

#[test]
fn focused_fields_are_not_overwritten() {
    let mut manager = preferences();
    let typing = Arc::new(FormField::default());
    let mirror = Arc::new(FormField::default());
    let typing_id = manager.bind("max_upload_speed", typing.clone());
    manager.bind("max_upload_speed", mirror.clone());

    manager
        .handle_field_event(typing_id, FieldEvent::Focus)
        .expect("bound");
    manager
        .update("max_upload_speed", 25.into())
        .expect("registered");

    assert!(typing.writes().is_empty());
    assert_eq!(mirror.writes(), vec![OptionValue::Number(25.0)]);
}

#[test]
fn entity_edits_never_leak() {
    let mut manager: MultiOptionsManager = MultiOptionsManager::with_options([
        ("max_connections", -1),
        ("max_upload_slots", -1),
    ]);

    manager.change_id(Some("a".into()), false);
    manager
        .update("max_connections", 10.into())
        .expect("registered");
    manager.change_id(Some("b".into()), false);
    manager
        .update("max_connections", 20.into())
        .expect("registered");

    manager.change_id(Some("a".into()), false);
    assert_eq!(manager.get("max_connections"), Some(OptionValue::Number(10.0)));
    manager.change_id(Some("b".into()), false);
    assert_eq!(manager.get("max_connections"), Some(OptionValue::Number(20.0)));
}

#[test]
fn observers_follow_a_form_session() {
    let mut manager = preferences();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    manager.subscribe(Box::new(move |event: &OptionsEvent| {
        sink.lock().expect("events").push(event.clone());
    }));

    manager.add_options([("utp", true)]);
    manager.update("utp", false.into()).expect("registered");
    manager.reset();

    let seen = seen.lock().expect("events");
    assert_eq!(
        *seen,
        vec![
            OptionsEvent::Added {
                option: "utp".into()
            },
            OptionsEvent::Changed {
                option: "utp".into(),
                value: OptionValue::Bool(false),
                old: Some(OptionValue::Bool(true)),
            },
            OptionsEvent::Reset,
        ]
    );
}
