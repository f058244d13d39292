//! SDR payloads.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vera_core::Did;

use crate::error::SdrError;

/// Value of the `type` claim of an SDR token.
pub const SDR_TYPE: &str = "sdr";

/// One requested claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Shown to the holder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Whether the request fails without this claim.
    #[serde(default)]
    pub essential: bool,
    /// The claim type asked for, e.g. `name`.
    pub claim_type: String,
    /// Acceptable issuer DIDs. Empty accepts any issuer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuers: Vec<Did>,
}

impl ClaimRequest {
    /// An essential request for `claim_type`.
    pub fn essential(claim_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            essential: true,
            claim_type: claim_type.into(),
            issuers: Vec::new(),
        }
    }
}

/// Tag and claims of a sign-SDR action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdrData {
    /// Correlation tag, usually the session id.
    pub tag: String,
    /// Requested claims, in order.
    pub claims: Vec<ClaimRequest>,
}

/// Ask the agent to sign an SDR as `did`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSignSdr {
    /// Requesting (and signing) DID.
    pub did: Did,
    /// The request body.
    pub data: SdrData,
}

impl ActionSignSdr {
    /// A sign-SDR action for `did`.
    pub fn new(did: Did, tag: impl Into<String>, claims: Vec<ClaimRequest>) -> Self {
        Self {
            did,
            data: SdrData {
                tag: tag.into(),
                claims,
            },
        }
    }
}

/// A selective disclosure request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdrRequest {
    /// Who asks.
    pub requester: Did,
    /// Correlation tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Requested claims, in order.
    pub claims: Vec<ClaimRequest>,
}

impl SdrRequest {
    /// Check the request is signable.
    pub fn validate(&self) -> Result<(), SdrError> {
        if matches!(self.tag.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(SdrError::InvalidRequest("tag is empty".into()));
        }
        if let Some(i) = self.claims.iter().position(|c| c.claim_type.trim().is_empty()) {
            return Err(SdrError::InvalidRequest(format!("claim {i} has no claimType")));
        }
        Ok(())
    }

    /// Token claims for this request, before `iss` and `iat` are added by
    /// the signer.
    pub fn to_claims(&self) -> Result<Value, SdrError> {
        let claims = serde_json::to_value(&self.claims)
            .map_err(|e| SdrError::InvalidRequest(e.to_string()))?;
        let mut out = json!({ "type": SDR_TYPE, "claims": claims });
        if let Some(tag) = &self.tag {
            out["tag"] = Value::String(tag.clone());
        }
        Ok(out)
    }

    /// Read a request from verified token claims.
    pub fn from_claims(claims: &Value) -> Result<Self, SdrError> {
        if claims.get("type").and_then(Value::as_str) != Some(SDR_TYPE) {
            return Err(SdrError::InvalidRequest("token is not an SDR".into()));
        }
        let iss = claims
            .get("iss")
            .and_then(Value::as_str)
            .ok_or_else(|| SdrError::InvalidRequest("SDR has no iss".into()))?;
        let requester = Did::new(iss).map_err(|e| SdrError::InvalidRequest(e.to_string()))?;
        let tag = claims.get("tag").and_then(Value::as_str).map(str::to_string);
        let requested = claims.get("claims").cloned().unwrap_or(Value::Array(Vec::new()));
        let claims: Vec<ClaimRequest> = serde_json::from_value(requested)
            .map_err(|e| SdrError::InvalidRequest(format!("claims: {e}")))?;
        let req = Self {
            requester,
            tag,
            claims,
        };
        req.validate()?;
        Ok(req)
    }
}

impl From<ActionSignSdr> for SdrRequest {
    fn from(action: ActionSignSdr) -> Self {
        Self {
            requester: action.did,
            tag: Some(action.data.tag),
            claims: action.data.claims,
        }
    }
}
