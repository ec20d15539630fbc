//! Default response bodies for each simulated backend.

use chrono::Utc;
use gateway_domain::RouteName;
use rand::Rng;
use serde_json::{Value, json};
use uuid::Uuid;

/// Learning rates swept by the simulated experimentation service.
const LEARNING_RATES: [f64; 4] = [1e-2, 3e-3, 1e-3, 3e-4];

/// Generate a plausible success body for `route` given the request payload.
#[must_use]
pub fn generate(route: RouteName, payload: &Value) -> Value {
    match route {
        RouteName::Preprocess => preprocess(payload),
        RouteName::Train => train(),
        RouteName::Predict => predict(payload),
        RouteName::Experiments => experiments(),
    }
}

fn preprocess(payload: &Value) -> Value {
    let feature_count = payload.as_object().map_or(0, serde_json::Map::len);
    json!({
        "processed": payload,
        "feature_count": feature_count,
        "processed_at": Utc::now(),
    })
}

fn train() -> Value {
    json!({
        "job_id": Uuid::new_v4(),
        "status": "started",
        "started_at": Utc::now(),
    })
}

fn predict(payload: &Value) -> Value {
    let mut rng = rand::thread_rng();
    let confidence: f64 = rng.gen_range(0.5..0.99);
    json!({
        "model": "simulated-llm",
        "input": payload,
        "prediction": if confidence > 0.75 { "positive" } else { "negative" },
        "confidence": (confidence * 1000.0).round() / 1000.0,
    })
}

fn experiments() -> Value {
    let mut rng = rand::thread_rng();
    let runs: Vec<Value> = LEARNING_RATES
        .iter()
        .map(|lr| {
            let accuracy: f64 = rng.gen_range(0.6..0.95);
            json!({
                "learning_rate": lr,
                "epochs": rng.gen_range(3..12),
                "accuracy": (accuracy * 1000.0).round() / 1000.0,
            })
        })
        .collect();

    let best = runs
        .iter()
        .max_by(|a, b| {
            let a = a["accuracy"].as_f64().unwrap_or_default();
            let b = b["accuracy"].as_f64().unwrap_or_default();
            a.total_cmp(&b)
        })
        .cloned()
        .unwrap_or(Value::Null);

    json!({
        "experiment_id": Uuid::new_v4(),
        "runs": runs,
        "best": best,
    })
}
