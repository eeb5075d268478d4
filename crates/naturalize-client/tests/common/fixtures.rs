//! Backend payloads used across the integration tests

use serde_json::{Value, json};

pub fn plans() -> Value {
    json!([
        {"id": 1, "title": "Basic", "plan_price": 9.99, "duration": "Monthly", "features": ["A", "B"]}
    ])
}

pub fn users() -> Value {
    json!([
        {
            "id": "u-1",
            "first_name": "Awa",
            "last_name": "Diop",
            "email": "awa@example.com",
            "plan": "premium",
            "account_status": "active",
            "role": "USER"
        },
        {
            "id": "u-2",
            "first_name": "Moussa",
            "last_name": null,
            "email": "moussa@example.com",
            "plan": "free",
            "account_status": "suspended",
            "role": "USER"
        }
    ])
}

pub fn own_envelope(data: Value, message: &str) -> Value {
    json!({"success": true, "data": data, "message": message})
}

pub fn message_body(message: &str) -> Value {
    json!({"message": message})
}
