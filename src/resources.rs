use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::value::RawValue;

pub const API_VERSION: &str = "webhook.acme.cert-manager.io/v1alpha1";
pub const KIND: &str = "ChallengeReview";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeAction {
    Present,
    CleanUp,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single DNS-01 challenge as handed over by cert-manager.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub uid: String,
    pub action: ChallengeAction,
    #[serde(rename = "type")]
    pub type_: String,
    /// The name of the domain being validated, e.g. `example.com`.
    pub dns_name: String,
    /// The TXT record value that has to be served.
    pub key: String,
    pub resource_namespace: String,
    /// The record name to present the key under, e.g. `_acme-challenge.example.com.`.
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,
    pub resolved_zone: String,
    pub allow_ambient_credentials: bool,
    /// Solver config from the issuer, decoded by [`crate::config::ProviderConfig::decode`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Box<RawValue>>,
}

impl ChallengeRequest {
    pub fn raw_config(&self) -> Option<&[u8]> {
        self.config.as_ref().map(|raw| raw.get().as_bytes())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeResponse {
    pub uid: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl ChallengeResponse {
    pub fn success(uid: impl ToString) -> Self {
        Self {
            uid: uid.to_string(),
            success: true,
            status: None,
        }
    }

    pub fn failure(uid: impl ToString, message: impl ToString) -> Self {
        Self {
            uid: uid.to_string(),
            success: false,
            status: Some(Status {
                status: Some("Failure".to_string()),
                message: Some(message.to_string()),
                ..Default::default()
            }),
        }
    }
}

/// Request/response envelope cert-manager exchanges with webhook solvers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeReview {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ChallengeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChallengeResponse>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW: &str = r#"{
        "apiVersion": "webhook.acme.cert-manager.io/v1alpha1",
        "kind": "ChallengeReview",
        "request": {
            "uid": "5c6e7e7a-7f8c-4a55-9d1e-0d3b6b1c2f10",
            "action": "Present",
            "type": "dns-01",
            "dnsName": "example.com",
            "key": "abc",
            "resourceNamespace": "cert-manager",
            "resolvedFQDN": "_acme-challenge.example.com.",
            "resolvedZone": "example.com.",
            "allowAmbientCredentials": false,
            "config": { "host": "gridmaster", "view": "default" }
        }
    }"#;

    #[test]
    fn decodes_review() {
        let review: ChallengeReview = serde_json::from_str(REVIEW).unwrap();
        let request = review.request.unwrap();
        assert_eq!(request.action, ChallengeAction::Present);
        assert_eq!(request.resolved_fqdn, "_acme-challenge.example.com.");
        assert_eq!(request.resource_namespace, "cert-manager");
        assert_eq!(request.key, "abc");

        let config: serde_json::Value = serde_json::from_slice(request.raw_config().unwrap()).unwrap();
        assert_eq!(config["host"], "gridmaster");
    }

    #[test]
    fn null_config_is_absent() {
        let request: ChallengeRequest = serde_json::from_str(r#"{ "action": "CleanUp", "config": null }"#).unwrap();
        assert_eq!(request.action, ChallengeAction::CleanUp);
        assert!(request.raw_config().is_none());
    }

    #[test]
    fn unknown_action() {
        let request: ChallengeRequest = serde_json::from_str(r#"{ "action": "Rotate" }"#).unwrap();
        assert_eq!(request.action, ChallengeAction::Unknown);
    }

    #[test]
    fn encodes_failure_response() {
        let json = serde_json::to_value(ChallengeResponse::failure("uid-1", "boom")).unwrap();
        assert_eq!(json["uid"], "uid-1");
        assert_eq!(json["success"], false);
        assert_eq!(json["status"]["status"], "Failure");
        assert_eq!(json["status"]["message"], "boom");

        let json = serde_json::to_value(ChallengeResponse::success("uid-2")).unwrap();
        assert_eq!(json, serde_json::json!({ "uid": "uid-2", "success": true }));
    }
}
