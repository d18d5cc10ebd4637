//! Response envelopes. Every line written to stdout is one of these.

use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({ "id": id, "ok": true, "result": result })
}

/// `details` is omitted from the wire when there are none.
pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut resp = json!({ "id": id, "ok": false });
    resp["error"] = error_body(code, message.into(), details);
    resp
}

/// Reply to a line that did not parse as a request, so there is no id.
pub fn bad_json(message: impl Into<String>) -> serde_json::Value {
    json!({
        "ok": false,
        "error": error_body("bad_json", message.into(), None),
    })
}

fn error_body(code: &str, message: String, details: Option<serde_json::Value>) -> serde_json::Value {
    let mut body = json!({ "code": code, "message": message });
    if let Some(d) = details {
        body["details"] = d;
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shapes() {
        let e = err("7", "not_found", "class not found", None);
        assert_eq!(e["id"], "7");
        assert_eq!(e["ok"], false);
        assert_eq!(e["error"]["code"], "not_found");
        assert!(e["error"].get("details").is_none());

        let d = err("8", "validation_failed", "bad marks", Some(json!({ "max": 80 })));
        assert_eq!(d["error"]["details"]["max"], 80);

        let b = bad_json("expected value");
        assert!(b.get("id").is_none());
        assert_eq!(b["error"]["code"], "bad_json");
    }
}
