//! The fixed prelude of every emitted program: metadata banner, include
//! list, and the blocking channel template.
//!
//! These are string templates; nothing here is reconstructed from the tree.

use crate::EmitMeta;

/// The fixed include list.
const INCLUDES: &[&str] = &[
    "iostream",
    "string",
    "vector",
    "queue",
    "functional",
    "mutex",
    "condition_variable",
    "fstream",
    "cmath",
    "chrono",
    "algorithm",
    "stdexcept",
];

/// Blocking single-producer/single-consumer channel. `send` locks, appends,
/// and signals; `recv` blocks until non-empty and pops. FIFO per channel.
const CHANNEL_TEMPLATE: &str = r#"template <typename T>
class Channel {
public:
    void send(const T& value) {
        std::unique_lock<std::mutex> lock(mu_);
        items_.push(value);
        ready_.notify_one();
    }
    T recv() {
        std::unique_lock<std::mutex> lock(mu_);
        ready_.wait(lock, [this] { return !items_.empty(); });
        T value = items_.front();
        items_.pop();
        return value;
    }
private:
    std::queue<T> items_;
    std::mutex mu_;
    std::condition_variable ready_;
};
"#;

/// Render the build metadata as a JSON object with stable key order.
pub(crate) fn metadata_json(meta: &EmitMeta) -> String {
    let mut map = serde_json::Map::new();
    map.insert("source".into(), meta.source.clone().into());
    map.insert("std".into(), meta.std.clone().into());
    map.insert("opt".into(), meta.opt.clone().into());
    for (key, value) in &meta.tags {
        map.insert(key.clone(), value.clone().into());
    }
    serde_json::Value::Object(map).to_string()
}

/// Escape a string for inclusion inside a C++ double-quoted literal.
fn cpp_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// The full prelude: banner comment, metadata constant, includes, channel.
pub(crate) fn render(meta: &EmitMeta) -> String {
    let mut out = String::new();
    out.push_str("// Generated by casec -- CASE to C++ transpiler\n");
    out.push_str(&format!("// source: {}\n", meta.source));
    out.push_str(&format!(
        "static const char* CASE_BUILD_METADATA = \"{}\";\n\n",
        cpp_escape(&metadata_json(meta))
    ));
    for include in INCLUDES {
        out.push_str(&format!("#include <{include}>\n"));
    }
    out.push('\n');
    out.push_str(CHANNEL_TEMPLATE);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> EmitMeta {
        EmitMeta {
            source: "demo.case".into(),
            std: "c++14".into(),
            opt: "O2".into(),
            cc: "g++".into(),
            tags: vec![("team".into(), "sim".into())],
        }
    }

    #[test]
    fn metadata_includes_tags() {
        let json = metadata_json(&meta());
        assert!(json.contains("\"source\":\"demo.case\""));
        assert!(json.contains("\"std\":\"c++14\""));
        assert!(json.contains("\"opt\":\"O2\""));
        assert!(json.contains("\"team\":\"sim\""));
    }

    #[test]
    fn prelude_contains_banner_includes_and_channel() {
        let rendered = render(&meta());
        assert!(rendered.contains("CASE_BUILD_METADATA"));
        assert!(rendered.contains("#include <iostream>"));
        assert!(rendered.contains("#include <condition_variable>"));
        assert!(rendered.contains("class Channel"));
        assert!(rendered.contains("ready_.wait(lock, [this] { return !items_.empty(); });"));
    }

    #[test]
    fn metadata_literal_is_escaped() {
        let rendered = render(&meta());
        // The JSON quotes must be escaped inside the C++ string literal.
        assert!(rendered.contains("\\\"source\\\""));
    }
}
