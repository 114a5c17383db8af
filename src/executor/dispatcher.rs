// Tool name -> handler routing.
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::PilotResult;
use crate::executor::actions::ActionExecutor;
use crate::executor::payload::{self, ToolError};
use crate::llm::tools::{CLICK_MOUSE, MOVE_MOUSE, SCROLL_DOWN, TAKE_SCREENSHOT, TYPE_TEXT};
use crate::llm::types::ToolCall;

/// What a tool call produced: the envelope for the tool turn and, for
/// screenshots, the PNG to attach as a follow-up user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub envelope: String,
    pub image: Option<Vec<u8>>,
}

impl ToolOutcome {
    pub fn ok() -> Self {
        Self {
            envelope: payload::encode_success(None),
            image: None,
        }
    }

    pub fn rejected(err: ToolError) -> Self {
        tracing::warn!(error = %err, "tool call rejected");
        Self {
            envelope: err.to_envelope(),
            image: None,
        }
    }
}

/// Common contract for every tool: raw arguments in, outcome out.
///
/// Argument problems are returned as a rejected outcome. An `Err` means the
/// desktop or the dump directory failed and the run must stop.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(
        &self,
        args: Option<&Value>,
        executor: &mut ActionExecutor,
    ) -> PilotResult<ToolOutcome>;
}

macro_rules! try_args {
    ($parsed:expr) => {
        match $parsed {
            Ok(v) => v,
            Err(e) => return Ok(ToolOutcome::rejected(e)),
        }
    };
}

pub struct TakeScreenshot;

#[async_trait]
impl ToolHandler for TakeScreenshot {
    fn name(&self) -> &'static str {
        TAKE_SCREENSHOT
    }

    async fn invoke(
        &self,
        args: Option<&Value>,
        executor: &mut ActionExecutor,
    ) -> PilotResult<ToolOutcome> {
        try_args!(payload::parse_arguments(args));
        let shot = executor.take_screenshot().await?;
        let mut extra = Map::new();
        extra.insert(
            "file".into(),
            Value::String(shot.file.to_string_lossy().into_owned()),
        );
        extra.insert("screen_w".into(), shot.screen_width.into());
        extra.insert("screen_h".into(), shot.screen_height.into());
        Ok(ToolOutcome {
            envelope: payload::encode_success(Some(extra)),
            image: Some(shot.png),
        })
    }
}

pub struct MoveMouse;

#[async_trait]
impl ToolHandler for MoveMouse {
    fn name(&self) -> &'static str {
        MOVE_MOUSE
    }

    async fn invoke(
        &self,
        args: Option<&Value>,
        executor: &mut ActionExecutor,
    ) -> PilotResult<ToolOutcome> {
        let (x, y) = try_args!(payload::parse_coordinates(args));
        executor.move_mouse(x, y).await?;
        Ok(ToolOutcome::ok())
    }
}

pub struct ClickMouse;

#[async_trait]
impl ToolHandler for ClickMouse {
    fn name(&self) -> &'static str {
        CLICK_MOUSE
    }

    async fn invoke(
        &self,
        args: Option<&Value>,
        executor: &mut ActionExecutor,
    ) -> PilotResult<ToolOutcome> {
        try_args!(payload::parse_arguments(args));
        executor.click_mouse().await?;
        Ok(ToolOutcome::ok())
    }
}

pub struct TypeText;

#[async_trait]
impl ToolHandler for TypeText {
    fn name(&self) -> &'static str {
        TYPE_TEXT
    }

    async fn invoke(
        &self,
        args: Option<&Value>,
        executor: &mut ActionExecutor,
    ) -> PilotResult<ToolOutcome> {
        let text = try_args!(payload::parse_text(args));
        executor.type_text(&text).await?;
        Ok(ToolOutcome::ok())
    }
}

pub struct ScrollDown;

#[async_trait]
impl ToolHandler for ScrollDown {
    fn name(&self) -> &'static str {
        SCROLL_DOWN
    }

    async fn invoke(
        &self,
        args: Option<&Value>,
        executor: &mut ActionExecutor,
    ) -> PilotResult<ToolOutcome> {
        try_args!(payload::parse_arguments(args));
        executor.scroll_down().await?;
        Ok(ToolOutcome::ok())
    }
}

/// Registry of tool handlers, keyed by the tool name the endpoint uses.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<&'static str, Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in desktop tools.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TakeScreenshot));
        registry.register(Box::new(MoveMouse));
        registry.register(Box::new(ClickMouse));
        registry.register(Box::new(TypeText));
        registry.register(Box::new(ScrollDown));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Routes `call` to its handler; unknown names become an `unknown_tool` envelope.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        executor: &mut ActionExecutor,
    ) -> PilotResult<ToolOutcome> {
        let name = call.function.name.as_str();
        match self.handlers.get(name) {
            Some(handler) => handler.invoke(call.function.arguments.as_ref(), executor).await,
            None => Ok(ToolOutcome::rejected(ToolError::unknown_tool(name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, CaptureConfig};
    use crate::errors::PilotError;
    use crate::executor::desktop::Desktop;
    use crate::llm::tools::load_builtin_tools;
    use crate::llm::types::FunctionCall;
    use crate::perception::types::{CapturedFrame, ScreenshotMeta};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingDesktop {
        calls: Mutex<Vec<String>>,
        fail_clicks: bool,
    }

    impl RecordingDesktop {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Desktop for RecordingDesktop {
        async fn capture_screenshot(&self, w: u32, h: u32) -> PilotResult<CapturedFrame> {
            self.calls.lock().unwrap().push(format!("capture {w}x{h}"));
            Ok(CapturedFrame {
                png: b"\x89PNG fake".to_vec(),
                meta: ScreenshotMeta {
                    screen_width: 2560,
                    screen_height: 1440,
                    image_width: w,
                    image_height: h,
                },
            })
        }

        async fn move_cursor_normalized(&self, x: f64, y: f64) -> PilotResult<()> {
            self.calls.lock().unwrap().push(format!("move {x} {y}"));
            Ok(())
        }

        async fn click_left(&self) -> PilotResult<()> {
            if self.fail_clicks {
                return Err(PilotError::Desktop("click refused".into()));
            }
            self.calls.lock().unwrap().push("click".into());
            Ok(())
        }

        async fn inject_text(&self, text: &str) -> PilotResult<()> {
            self.calls.lock().unwrap().push(format!("type {text:?}"));
            Ok(())
        }

        async fn scroll_down(&self) -> PilotResult<()> {
            self.calls.lock().unwrap().push("scroll".into());
            Ok(())
        }
    }

    fn executor(desktop: Arc<RecordingDesktop>, dir: &std::path::Path) -> ActionExecutor {
        let capture = CaptureConfig {
            dump_dir: dir.to_path_buf(),
            target_width: 1000,
            target_height: 600,
            ..CaptureConfig::default()
        };
        let agent = AgentConfig {
            settle_delay_ms: 0,
            ..AgentConfig::default()
        };
        ActionExecutor::new(desktop, &capture, &agent).unwrap()
    }

    fn call(name: &str, args: Option<&str>) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: args.map(|a| Value::String(a.into())),
            },
        }
    }

    fn envelope(outcome: &ToolOutcome) -> Value {
        serde_json::from_str(&outcome.envelope).unwrap()
    }

    fn succeeded(outcome: &ToolOutcome) -> bool {
        envelope(outcome)["ok"] == true
    }

    #[test]
    fn every_schema_tool_has_a_handler() {
        let registry = ToolRegistry::builtin();
        for tool in load_builtin_tools().unwrap() {
            assert!(registry.contains(&tool.function.name), "{}", tool.function.name);
        }
        assert_eq!(registry.names().len(), 5);
    }

    #[tokio::test]
    async fn screenshot_is_dumped_and_attached() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = Arc::new(RecordingDesktop::default());
        let mut exec = executor(desktop.clone(), dir.path());

        let outcome = ToolRegistry::builtin()
            .dispatch(&call(TAKE_SCREENSHOT, None), &mut exec)
            .await
            .unwrap();

        let env = envelope(&outcome);
        assert_eq!(env["ok"], true);
        assert_eq!(env["screen_w"], 2560);
        assert_eq!(env["screen_h"], 1440);
        let file = dir.path().join("shot_0000.png");
        assert_eq!(env["file"], file.to_string_lossy().as_ref());
        assert_eq!(outcome.image.as_deref(), Some(&b"\x89PNG fake"[..]));
        assert!(file.exists());
        assert_eq!(desktop.calls(), ["capture 1000x600"]);
        assert_eq!(exec.dump_index(), 1);
    }

    #[tokio::test]
    async fn move_mouse_passes_clamped_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = Arc::new(RecordingDesktop::default());
        let mut exec = executor(desktop.clone(), dir.path());

        let outcome = ToolRegistry::builtin()
            .dispatch(&call(MOVE_MOUSE, Some(r#"{"x":-5,"y":1500}"#)), &mut exec)
            .await
            .unwrap();

        assert_eq!(outcome, ToolOutcome::ok());
        assert_eq!(desktop.calls(), ["move 0 1000"]);
    }

    #[tokio::test]
    async fn invalid_arguments_skip_the_desktop() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = Arc::new(RecordingDesktop::default());
        let mut exec = executor(desktop.clone(), dir.path());
        let registry = ToolRegistry::builtin();

        for (name, args) in [
            (MOVE_MOUSE, r#"{"x":1}"#),
            (CLICK_MOUSE, "[1,2]"),
            (TYPE_TEXT, "not json"),
            (SCROLL_DOWN, "{"),
            (TAKE_SCREENSHOT, "nope"),
        ] {
            let outcome = registry.dispatch(&call(name, Some(args)), &mut exec).await.unwrap();
            let env = envelope(&outcome);
            assert_eq!(env["ok"], false, "{name}");
            assert_eq!(env["error"]["type"], "invalid_arguments", "{name}");
            assert!(!succeeded(&outcome));
        }
        assert!(desktop.calls().is_empty());
        assert_eq!(exec.dump_index(), 0);
    }

    #[tokio::test]
    async fn type_text_sends_ascii_only() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = Arc::new(RecordingDesktop::default());
        let mut exec = executor(desktop.clone(), dir.path());

        let outcome = ToolRegistry::builtin()
            .dispatch(&call(TYPE_TEXT, Some(r#"{"text":"héllo"}"#)), &mut exec)
            .await
            .unwrap();

        assert!(succeeded(&outcome));
        assert_eq!(desktop.calls(), [r#"type "hllo""#]);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = Arc::new(RecordingDesktop::default());
        let mut exec = executor(desktop.clone(), dir.path());

        let outcome = ToolRegistry::builtin()
            .dispatch(&call("delete_everything", Some("{}")), &mut exec)
            .await
            .unwrap();

        let env = envelope(&outcome);
        assert_eq!(env["error"]["type"], "unknown_tool");
        assert_eq!(env["error"]["message"], "delete_everything");
        assert!(desktop.calls().is_empty());
    }

    #[tokio::test]
    async fn desktop_failures_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = Arc::new(RecordingDesktop {
            fail_clicks: true,
            ..RecordingDesktop::default()
        });
        let mut exec = executor(desktop, dir.path());

        let result = ToolRegistry::builtin()
            .dispatch(&call(CLICK_MOUSE, None), &mut exec)
            .await;
        assert!(matches!(result, Err(PilotError::Desktop(_))));
    }
}
