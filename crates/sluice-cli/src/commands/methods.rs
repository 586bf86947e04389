use serde_json::Value;
use sluice_rpc::split_call_options;

use crate::cli::{CallArgs, MethodsArgs, OutputFormat};
use crate::client::{AppContext, CliResult};
use crate::output::{render_methods, render_value};

pub(crate) fn handle_methods(ctx: &AppContext, args: MethodsArgs, format: OutputFormat) -> CliResult<()> {
    let names = match args.namespace {
        Some(namespace) => ctx
            .client
            .namespace(&namespace)?
            .methods()
            .into_iter()
            .map(|method| format!("{namespace}.{method}"))
            .collect(),
        None => ctx.client.method_names(),
    };
    render_methods(&names, format)
}

pub(crate) async fn handle_call(ctx: &AppContext, args: CallArgs, format: OutputFormat) -> CliResult<()> {
    let method = ctx.client.method(&args.method)?;
    let (params, options) = split_call_options(args.params.iter().map(|raw| parse_param(raw)).collect());
    if let Some(options) = options {
        tracing::warn!(
            keys = ?options.keys().collect::<Vec<_>>(),
            "ignoring trailing call options argument"
        );
    }

    let result = method.invoke(params).await?;
    render_value(&result, format)
}

/// Read a positional argument as JSON, keeping it as a plain string otherwise.
pub(crate) fn parse_param(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CliError;
    use crate::client::tests::connected;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn params_fall_back_to_strings() {
        assert_eq!(parse_param("42"), json!(42));
        assert_eq!(parse_param("[\"name\", \"state\"]"), json!(["name", "state"]));
        assert_eq!(parse_param("abc123"), json!("abc123"));
        assert_eq!(parse_param("\"quoted\""), json!("quoted"));
    }

    #[tokio::test]
    async fn methods_can_be_filtered_by_namespace() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = connected(&server, &["core.get_config", "web.connected"]).await?;

        handle_methods(&ctx, MethodsArgs::default(), OutputFormat::Table)?;
        handle_methods(
            &ctx,
            MethodsArgs {
                namespace: Some("web".into()),
            },
            OutputFormat::Json,
        )?;
        let missing = handle_methods(
            &ctx,
            MethodsArgs {
                namespace: Some("label".into()),
            },
            OutputFormat::Table,
        );
        assert!(matches!(missing, Err(CliError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn call_sends_parsed_params_without_trailing_options() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = connected(&server, &["web.get_torrent_status"]).await?;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/json").json_body(json!({
                "method": "web.get_torrent_status",
                "params": ["abc", ["name"]],
                "id": 1
            }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"result": {"name": "ubuntu.iso"}, "error": null, "id": 1}));
        });

        handle_call(
            &ctx,
            CallArgs {
                method: "web.get_torrent_status".into(),
                params: vec![
                    "abc".into(),
                    "[\"name\"]".into(),
                    "{\"success\": \"render\"}".into(),
                ],
            },
            OutputFormat::Json,
        )
        .await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn undiscovered_methods_are_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = connected(&server, &["core.get_config"]).await?;
        let outcome = handle_call(
            &ctx,
            CallArgs {
                method: "core.shutdown".into(),
                params: Vec::new(),
            },
            OutputFormat::Table,
        )
        .await;
        assert!(matches!(outcome, Err(CliError::Validation(_))));
        Ok(())
    }
}
