use super::Diagnostic;

/// One-line JSON form of a diagnostic.
pub fn render(d: &Diagnostic) -> String {
    let mut obj = serde_json::json!({
        "severity": "error",
        "message": d.message,
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::String(code.to_string());
    }

    if let Some(label) = &d.label {
        let mut span = serde_json::json!({
            "start": label.span.start,
            "end": label.span.end,
            "message": label.message,
        });
        if let Some(at) = d.location() {
            span["line"] = serde_json::Value::from(at.row);
            span["col"] = serde_json::Value::from(at.col);
        }
        obj["span"] = span;
    }

    if let Some(position) = d.position {
        obj["position"] = serde_json::json!({ "row": position.row, "col": position.col });
    }

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    serde_json::to_string(&obj)
        .unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExceptionRecord, TypeError};
    use crate::unit::Span;

    fn parse_json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).expect("valid JSON")
    }

    #[test]
    fn render_basic_error() {
        let v = parse_json(&render(&Diagnostic::error("bad")));
        assert_eq!(v["severity"], "error");
        assert_eq!(v["message"], "bad");
        assert!(v.get("span").is_none());
        assert!(v.get("code").is_none());
    }

    #[test]
    fn render_record_with_span() {
        let e = ExceptionRecord::at(TypeError::NonCallableObject, Span::new(9, 10));
        let v = parse_json(&render(&Diagnostic::from_record(&e, "f(1, 2, 3)")));
        assert_eq!(v["code"], "SE-T001");
        assert_eq!(v["message"], "TypeError: object is not callable");
        assert_eq!(v["span"]["start"], 9);
        assert_eq!(v["span"]["end"], 10);
        assert_eq!(v["span"]["line"], 1);
        assert_eq!(v["span"]["col"], 10);
        assert!(v["suggestion"].is_string());
    }

    #[test]
    fn span_without_source_has_no_line_col() {
        let d = Diagnostic::error("bad").with_span(Span::new(5, 8), "here");
        let v = parse_json(&render(&d));
        assert!(v["span"].get("line").is_none());
        assert!(v["span"].get("col").is_none());
    }

    #[test]
    fn render_is_single_line() {
        let d = Diagnostic::error("complex")
            .with_note("one")
            .with_note("two")
            .with_suggestion("fix it");
        let out = render(&d);
        assert!(!out.contains('\n'));
        assert_eq!(parse_json(&out)["notes"].as_array().unwrap().len(), 2);
    }
}
