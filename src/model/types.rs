use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub prediction: u8,
    pub prediction_label: String,
    pub risk_percentage: f64,
    pub risk_category: String,
    pub confidence: f64,
}

impl PredictionResponse {
    /// Map a positive-class probability to the response contract: label at
    /// the 0.5 cut, percentage rounded to one decimal, category bands at
    /// 30% and 60%.
    pub fn from_probability(probability: f32) -> Self {
        let p = f64::from(probability).clamp(0.0, 1.0);
        let prediction = u8::from(p > 0.5);
        let risk_percentage = (p * 1000.0).round() / 10.0;
        let risk_category = if risk_percentage < 30.0 {
            "Low Risk"
        } else if risk_percentage < 60.0 {
            "Moderate Risk"
        } else {
            "High Risk"
        };
        let prediction_label = if prediction == 1 {
            "Diabetes Risk"
        } else {
            "No Diabetes"
        };

        PredictionResponse {
            prediction,
            prediction_label: prediction_label.to_string(),
            risk_percentage,
            risk_category: risk_category.to_string(),
            confidence: p.max(1.0 - p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_bands() {
        assert_eq!(PredictionResponse::from_probability(0.12).risk_category, "Low Risk");
        assert_eq!(
            PredictionResponse::from_probability(0.45).risk_category,
            "Moderate Risk"
        );
        assert_eq!(PredictionResponse::from_probability(0.8).risk_category, "High Risk");
    }

    #[test]
    fn threshold_and_confidence() {
        let low = PredictionResponse::from_probability(0.2);
        assert_eq!(low.prediction, 0);
        assert_eq!(low.prediction_label, "No Diabetes");
        assert!((low.confidence - 0.8).abs() < 1e-6);

        let high = PredictionResponse::from_probability(0.9);
        assert_eq!(high.prediction, 1);
        assert_eq!(high.prediction_label, "Diabetes Risk");
        assert!((high.risk_percentage - 90.0).abs() < 1e-6);
    }
}
