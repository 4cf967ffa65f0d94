//! Manual smoke checks against a deployed instance.
//!
//! Four independent calls; each prints its JSON body or its error and never
//! stops the checks that follow. There is no retry and no overall verdict.

use serde_json::{Value, json};

pub struct SmokeClient {
    client: reqwest::Client,
    base_url: String,
}

/// Outcome of one check, kept around so callers (and tests) can see what
/// happened; the exit code never depends on it.
#[derive(Debug)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub result: Result<Value, String>,
}

/// The fixed prediction payload the smoke test posts to `/predict`.
pub fn sample_payload() -> Value {
    json!({
        "features": {
            "HighBP": 1,
            "HighChol": 1,
            "CholCheck": 1,
            "BMI": 28.5,
            "Smoker": 0,
            "Stroke": 0,
            "HeartDiseaseorAttack": 0,
            "PhysActivity": 1,
            "Fruits": 1,
            "Veggies": 1,
            "HvyAlcoholConsump": 0,
            "AnyHealthcare": 1,
            "NoDocbcCost": 0,
            "GenHlth": 2,
            "MentHlth": 5,
            "PhysHlth": 3,
            "DiffWalk": 0,
            "Sex": 1,
            "Age": 7,
            "Education": 4,
            "Income": 5
        }
    })
}

impl SmokeClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run all four checks in order, printing as we go.
    pub async fn run_all(&self) -> Vec<CheckOutcome> {
        println!("Testing deployed API at {}\n", self.base_url);

        let mut outcomes = Vec::with_capacity(4);
        outcomes.push(self.check_get("root endpoint", "/").await);
        outcomes.push(self.check_get("health endpoint", "/health").await);
        outcomes.push(self.check_get("model info endpoint", "/model-info").await);
        outcomes.push(self.check_predict().await);

        println!("Smoke checks complete");
        outcomes
    }

    async fn check_get(&self, name: &'static str, path: &str) -> CheckOutcome {
        println!("Checking {name} ({path})...");
        let result = self.get_json(path).await;
        self.report(name, result)
    }

    async fn check_predict(&self) -> CheckOutcome {
        let name = "prediction endpoint";
        println!("Checking {name} (/predict)...");
        let result = self.post_json("/predict", &sample_payload()).await;
        if let Ok(body) = &result {
            println!("  prediction: {}", body.get("prediction").unwrap_or(&Value::Null));
            println!(
                "  risk: {}%",
                body.get("risk_percentage").unwrap_or(&Value::Null)
            );
            println!(
                "  category: {}",
                body.get("risk_category").unwrap_or(&Value::Null)
            );
        }
        self.report(name, result)
    }

    fn report(&self, name: &'static str, result: Result<Value, String>) -> CheckOutcome {
        match &result {
            Ok(body) => {
                let pretty =
                    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
                println!("  response: {pretty}\n");
            }
            Err(err) => println!("  error: {err}\n"),
        }
        CheckOutcome { name, result }
    }

    async fn get_json(&self, path: &str) -> Result<Value, String> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| e.to_string())?;
        println!("  status: {}", response.status());
        response.json().await.map_err(|e| e.to_string())
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, String> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        println!("  status: {}", response.status());
        response.json().await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_all_twenty_one_features() {
        let payload = sample_payload();
        let features = payload.get("features").and_then(Value::as_object).unwrap();
        assert_eq!(features.len(), 21);
        assert!(features.contains_key("BMI"));
    }

    #[tokio::test]
    async fn unreachable_host_fails_every_check_without_aborting() {
        // Discard port on loopback: connections are refused immediately.
        let client = SmokeClient::new("http://127.0.0.1:9");
        let outcomes = client.run_all().await;
        assert_eq!(outcomes.len(), 4, "later checks must still run");
        assert!(outcomes.iter().all(|o| o.result.is_err()));
    }
}
