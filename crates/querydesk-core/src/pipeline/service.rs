//! Customer-service branch pipeline: categorize, then answer from a
//! fixed template per category.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use querydesk_types::error::ChatError;
use querydesk_types::event::{EventType, FinalResponse};
use querydesk_types::generation::GenerationRequest;
use querydesk_types::route::CustomerCategory;

use crate::generation::parse::parse_json_payload;
use crate::generation::provider::GenerationProvider;
use crate::pipeline::EventSink;

const CATEGORIZER_SYSTEM_PROMPT: &str = r#"You are a customer inquiry categorizer. Classify the inquiry into exactly one of three categories:

- "Technical Support": internet, network, login, password, software, errors, crashes, things not working
- "Billing": bills, invoices, payments, charges, refunds, subscriptions, account balance
- "General Inquiry": everything else (service questions, feedback, business hours)

Return ONLY a JSON object in this exact format:
{"category": "Technical Support" | "Billing" | "General Inquiry"}"#;

#[derive(Debug, Deserialize)]
struct CategoryVerdict {
    category: String,
}

/// One canned template per category.
fn template(category: CustomerCategory) -> &'static str {
    match category {
        CustomerCategory::TechnicalSupport => {
            "Thank you for contacting technical support. Please provide your account \
             number and we will connect you with a specialist."
        }
        CustomerCategory::Billing => {
            "Thank you for contacting billing. Please provide your account number and \
             the invoice details, and we will assist you."
        }
        CustomerCategory::GeneralInquiry => {
            "Thank you for your inquiry. We will route your request to the appropriate \
             department."
        }
    }
}

/// Handles problem reports, complaints, and account issues.
pub struct CustomerServicePipeline<P: GenerationProvider> {
    provider: Arc<P>,
}

impl<P: GenerationProvider> CustomerServicePipeline<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn run(&self, inquiry: &str, sink: &EventSink) -> Result<FinalResponse, ChatError> {
        sink.emit(EventType::Categorizing, "Categorizing your inquiry").await;
        let request = GenerationRequest::new(CATEGORIZER_SYSTEM_PROMPT, inquiry);
        let response = self.provider.complete(&request).await?;

        // An off-list category string falls back to the default bucket
        // rather than failing the whole branch.
        let category = parse_json_payload::<CategoryVerdict>(&response.text)
            .ok()
            .and_then(|v| v.category.parse::<CustomerCategory>().ok())
            .unwrap_or_else(|| {
                debug!("unrecognized category verdict, defaulting to general inquiry");
                CustomerCategory::GeneralInquiry
            });

        sink.emit(EventType::Responding, format!("Preparing a {category} response"))
            .await;
        Ok(FinalResponse::CustomerService {
            original_inquiry: inquiry.to_string(),
            category,
            suggested_response: template(category).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ScriptedProvider;
    use querydesk_types::event::ProgressEvent;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn sink() -> (EventSink, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (EventSink::new(tx, Uuid::now_v7()), rx)
    }

    #[tokio::test]
    async fn test_technical_support_template() {
        let provider = ScriptedProvider::with_responses(vec![
            r#"{"category": "Technical Support"}"#,
        ]);
        let p = CustomerServicePipeline::new(Arc::new(provider));
        let (sink, _rx) = sink();

        let response = p
            .run("My internet is not working after the update", &sink)
            .await
            .unwrap();
        match response {
            FinalResponse::CustomerService {
                original_inquiry,
                category,
                suggested_response,
            } => {
                assert_eq!(original_inquiry, "My internet is not working after the update");
                assert_eq!(category, CustomerCategory::TechnicalSupport);
                assert!(suggested_response.contains("technical support"));
            }
            other => panic!("expected customer service response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_billing_template() {
        let provider = ScriptedProvider::with_responses(vec![r#"{"category": "Billing"}"#]);
        let p = CustomerServicePipeline::new(Arc::new(provider));
        let (sink, _rx) = sink();

        let response = p
            .run("I was charged twice for my subscription", &sink)
            .await
            .unwrap();
        match response {
            FinalResponse::CustomerService { category, suggested_response, .. } => {
                assert_eq!(category, CustomerCategory::Billing);
                assert!(suggested_response.contains("billing"));
            }
            other => panic!("expected customer service response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_category_defaults_to_general() {
        let provider =
            ScriptedProvider::with_responses(vec![r#"{"category": "Complaints Dept"}"#]);
        let p = CustomerServicePipeline::new(Arc::new(provider));
        let (sink, _rx) = sink();

        let response = p.run("What are your business hours?", &sink).await.unwrap();
        match response {
            FinalResponse::CustomerService { category, .. } => {
                assert_eq!(category, CustomerCategory::GeneralInquiry);
            }
            other => panic!("expected customer service response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let p = CustomerServicePipeline::new(Arc::new(ScriptedProvider::failing()));
        let (sink, _rx) = sink();

        let result = p.run("help with my account", &sink).await;
        assert!(matches!(result, Err(ChatError::Generation(_))));
    }

    #[tokio::test]
    async fn test_event_order() {
        let provider = ScriptedProvider::with_responses(vec![r#"{"category": "Billing"}"#]);
        let p = CustomerServicePipeline::new(Arc::new(provider));
        let (sink, mut rx) = sink();

        p.run("billing question", &sink).await.unwrap();
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event_type);
        }
        assert_eq!(kinds, vec![EventType::Categorizing, EventType::Responding]);
    }
}
