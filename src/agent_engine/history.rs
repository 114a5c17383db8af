//! Screenshot history pruning.
//!
//! Every screenshot is resent on each request until it ages out. Only the
//! newest `keep_last` image turns keep their data; older ones are reduced to
//! a text stub that still names the dumped file when it is known.
use std::borrow::Cow;

use crate::llm::types::{ChatMessage, MessageContent, IMAGE_LABEL};

/// Indices of user turns that carry an image part, oldest first.
pub fn image_turn_indices(messages: &[ChatMessage]) -> Vec<usize> {
    messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.has_image())
        .map(|(i, _)| i)
        .collect()
}

/// Returns `messages` with all but the newest `keep_last` image turns replaced
/// by a text stub. Borrows the input when nothing needs compacting.
pub fn prune_screenshots(messages: &[ChatMessage], keep_last: usize) -> Cow<'_, [ChatMessage]> {
    let idxs = image_turn_indices(messages);
    if idxs.len() <= keep_last {
        return Cow::Borrowed(messages);
    }

    // sorted ascending, so membership is a binary search
    let stale = &idxs[..idxs.len() - keep_last];
    let pruned: Vec<ChatMessage> = messages
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            if stale.binary_search(&i).is_err() {
                return msg.clone();
            }
            let hint = i
                .checked_sub(1)
                .and_then(|prev| dumped_file(&messages[prev]))
                .map(|file| format!(" (omitted; file={file})"))
                .unwrap_or_default();
            ChatMessage::User {
                content: MessageContent::Text(format!("{IMAGE_LABEL}{hint}")),
            }
        })
        .collect();
    tracing::debug!(
        pruned = stale.len(),
        kept = keep_last,
        "screenshot history compacted"
    );
    Cow::Owned(pruned)
}

/// The `file` of a successful tool envelope, if `msg` is one.
fn dumped_file(msg: &ChatMessage) -> Option<String> {
    let ChatMessage::Tool { content, .. } = msg else {
        return None;
    };
    let meta: serde_json::Value = serde_json::from_str(content).ok()?;
    if meta.get("ok").and_then(|v| v.as_bool()) != Some(true) {
        return None;
    }
    meta.get("file")
        .and_then(|f| f.as_str())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::payload::{encode_error, encode_success, ToolErrorKind};
    use serde_json::{json, Map};

    fn shot_envelope(file: &str) -> String {
        let mut extra = Map::new();
        extra.insert("file".into(), json!(file));
        extra.insert("screen_w".into(), json!(1920));
        extra.insert("screen_h".into(), json!(1080));
        encode_success(Some(extra))
    }

    /// system, task, then `n` (tool, image) pairs.
    fn conversation(n: usize) -> Vec<ChatMessage> {
        let mut msgs = vec![ChatMessage::system("sys"), ChatMessage::user_text("task")];
        for i in 0..n {
            msgs.push(ChatMessage::tool(
                format!("c{i}"),
                "take_screenshot",
                shot_envelope(&format!("dumps/shot_{i:04}.png")),
            ));
            msgs.push(ChatMessage::screenshot(&[i as u8]));
        }
        msgs
    }

    fn text_of(msg: &ChatMessage) -> &str {
        match msg {
            ChatMessage::User {
                content: MessageContent::Text(t),
            } => t,
            other => panic!("not a text user turn: {other:?}"),
        }
    }

    #[test]
    fn at_or_below_limit_is_untouched() {
        let msgs = conversation(2);
        let out = prune_screenshots(&msgs, 2);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out.as_ref(), msgs.as_slice());
    }

    #[test]
    fn one_over_limit_rewrites_only_the_oldest() {
        let msgs = conversation(3);
        let out = prune_screenshots(&msgs, 2);
        assert_eq!(image_turn_indices(&out), vec![5, 7]);
        assert_eq!(
            text_of(&out[3]),
            "captured image data (omitted; file=dumps/shot_0000.png)"
        );
        for i in (0..msgs.len()).filter(|&i| i != 3) {
            assert_eq!(out[i], msgs[i]);
        }
    }

    #[test]
    fn pruning_is_idempotent() {
        let msgs = conversation(5);
        let once = prune_screenshots(&msgs, 2).into_owned();
        let twice = prune_screenshots(&once, 2).into_owned();
        assert_eq!(once, twice);
        assert_eq!(image_turn_indices(&twice).len(), 2);
    }

    #[test]
    fn keep_zero_drops_every_image() {
        let msgs = conversation(2);
        let out = prune_screenshots(&msgs, 0);
        assert!(image_turn_indices(&out).is_empty());
    }

    #[test]
    fn stub_without_file_hint() {
        let mut msgs = vec![ChatMessage::system("sys"), ChatMessage::screenshot(b"a")];
        msgs.push(ChatMessage::tool(
            "c1",
            "take_screenshot",
            encode_error(ToolErrorKind::InvalidArguments, "bad"),
        ));
        msgs.push(ChatMessage::screenshot(b"b"));
        msgs.push(ChatMessage::tool("c2", "take_screenshot", "not json"));
        msgs.push(ChatMessage::screenshot(b"c"));
        msgs.push(ChatMessage::screenshot(b"d"));

        let out = prune_screenshots(&msgs, 1);
        // preceded by system, a failed envelope, unparseable content, an image turn
        for i in [1, 3, 5] {
            assert_eq!(text_of(&out[i]), "captured image data");
        }
        assert!(out[6].has_image());
    }

    #[test]
    fn stale_turns_carry_no_image_data() {
        let msgs = conversation(4);
        let out = prune_screenshots(&msgs, 1);
        assert_eq!(out.len(), msgs.len());
        let body = serde_json::to_string(out.as_ref()).unwrap();
        assert_eq!(body.matches("data:image/png;base64,").count(), 1);
        assert_eq!(out[9], msgs[9]);
    }

    #[test]
    fn text_only_user_turns_are_ignored() {
        let mut msgs = conversation(1);
        msgs.push(ChatMessage::user_text("captured image data"));
        let out = prune_screenshots(&msgs, 1);
        assert_eq!(out.as_ref(), msgs.as_slice());
    }
}
