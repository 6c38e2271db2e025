//! Simulated mobile client.
//!
//! Performs the device side of an activation: it generates the device key
//! pair, sends its public key to the server inside an application-scope ECIES
//! request, and derives the signature keys from the server's answer. Once
//! activated it can open activation-scope channels bound to the transport key.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pa_crypto::{
    hash::{hmac_sha256_full, sha256},
    protocol::derive_master_secret,
    derive_all_secret_keys, Encryptor, KeyPair, ResponseDecryptor, SignatureKeys,
};

use crate::{
    config::ApplicationSetup,
    cryptogram::{
        decrypt_response_object, encrypt_request_object, EncryptedRequest, EncryptedResponse,
    },
    errors::{CoreError, CoreResult},
};

/// `sharedInfo1` of the activation key exchange.
pub const ACTIVATION_SHARED_INFO1: &str = "/pa/activation";

// ============================================================================
// Wire models
// ============================================================================

/// What the user (or test) supplies when creating an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivationData {
    pub activation_name: String,
    pub platform: String,
    pub device_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_otp: Option<String>,
}

/// Decrypted body of the activation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationRequestPayload {
    #[serde(flatten)]
    pub data: CreateActivationData,
    /// Base64 of the compressed device public key.
    pub device_public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryData {
    pub recovery_code: String,
    pub puk: String,
}

/// Decrypted body of the activation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivationResponse {
    pub activation_id: String,
    /// Base64 of the server public key for this activation.
    pub server_public_key: String,
    pub ctr_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_recovery: Option<RecoveryData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationStatus {
    Created,
    PendingCommit,
    Active,
    Blocked,
    Removed,
}

/// Server answer to an activation prepare call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationPrepareResult {
    pub application_id: String,
    pub activation_id: String,
    pub activation_status: ActivationStatus,
    pub user_id: String,
    pub encrypted_data: String,
    pub mac: String,
}

// ============================================================================
// Shared info derivation
// ============================================================================

/// `sharedInfo2` for application-scope channels: `SHA256(appSecret)`.
pub fn application_scope_shared_info2(app_secret: &str) -> [u8; 32] {
    sha256(app_secret.as_bytes())
}

/// `sharedInfo2` for activation-scope channels: `HMAC(transportKey, appSecret)`.
pub fn activation_scope_shared_info2(
    transport_key: &[u8],
    app_secret: &str,
) -> CoreResult<[u8; 32]> {
    Ok(hmac_sha256_full(transport_key, app_secret.as_bytes())?)
}

// ============================================================================
// Client state machine
// ============================================================================

/// Keys and identifiers of an established activation.
#[derive(Debug, Clone)]
pub struct ActivationMaterial {
    pub activation_id: String,
    pub device_keys: KeyPair,
    pub server_public_key: Vec<u8>,
    pub keys: SignatureKeys,
    pub ctr_data: String,
    pub recovery_data: Option<RecoveryData>,
}

/// Activation state of the client.
#[derive(Debug, Default)]
pub enum ActivationState {
    #[default]
    Idle,
    /// Request sent, waiting for the server's prepare result.
    PendingExchange {
        device_keys: KeyPair,
        exchange: ResponseDecryptor,
    },
    Established(ActivationMaterial),
}

impl ActivationState {
    fn name(&self) -> &'static str {
        match self {
            ActivationState::Idle => "idle",
            ActivationState::PendingExchange { .. } => "pending",
            ActivationState::Established(_) => "established",
        }
    }
}

#[derive(Debug)]
pub struct MobileClient {
    setup: ApplicationSetup,
    state: ActivationState,
}

impl MobileClient {
    pub fn new(setup: ApplicationSetup) -> Self {
        Self {
            setup,
            state: ActivationState::Idle,
        }
    }

    pub fn setup(&self) -> &ApplicationSetup {
        &self.setup
    }

    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    pub fn has_activation(&self) -> bool {
        matches!(self.state, ActivationState::Established(_))
    }

    pub fn has_pending_activation(&self) -> bool {
        matches!(self.state, ActivationState::PendingExchange { .. })
    }

    pub fn activation(&self) -> Option<&ActivationMaterial> {
        match &self.state {
            ActivationState::Established(m) => Some(m),
            _ => None,
        }
    }

    /// Start an activation and return the request for the server.
    ///
    /// Only allowed while idle. The state is left untouched on failure.
    pub fn create_activation(
        &mut self,
        data: &CreateActivationData,
    ) -> CoreResult<EncryptedRequest> {
        if !matches!(self.state, ActivationState::Idle) {
            return Err(CoreError::State(format!(
                "activation is {}, cannot create another one",
                self.state.name()
            )));
        }

        let device_keys = KeyPair::generate();
        let encryptor = self.encryptor_for_application_scope(ACTIVATION_SHARED_INFO1)?;
        let payload = ActivationRequestPayload {
            data: data.clone(),
            device_public_key: B64.encode(device_keys.public_key(true)),
        };
        let (request, exchange) = encrypt_request_object(encryptor, &payload)?;

        #[cfg(feature = "dump-envelope-keys")]
        dump_envelope_key("activation request", exchange.envelope_key());

        info!(
            name = %data.activation_name,
            platform = %data.platform,
            "activation request created"
        );
        self.state = ActivationState::PendingExchange { device_keys, exchange };
        Ok(request)
    }

    /// Finish the activation with the server's prepare result.
    ///
    /// The pending exchange is consumed whether or not this succeeds; after a
    /// failure the client is idle again.
    pub fn commit_activation(&mut self, result: &ActivationPrepareResult) -> CoreResult<()> {
        let (device_keys, exchange) = match std::mem::take(&mut self.state) {
            ActivationState::PendingExchange { device_keys, exchange } => (device_keys, exchange),
            other => {
                let name = other.name();
                self.state = other;
                return Err(CoreError::State(format!("no pending activation, client is {name}")));
            }
        };

        let material = Self::finish_exchange(device_keys, exchange, result).map_err(|e| {
            warn!(activation_id = %result.activation_id, error = %e, "activation commit failed");
            e
        })?;

        info!(activation_id = %material.activation_id, "activation established");
        self.state = ActivationState::Established(material);
        Ok(())
    }

    fn finish_exchange(
        device_keys: KeyPair,
        exchange: ResponseDecryptor,
        result: &ActivationPrepareResult,
    ) -> CoreResult<ActivationMaterial> {
        let response = EncryptedResponse {
            encrypted_data: result.encrypted_data.clone(),
            mac: result.mac.clone(),
        };
        let decrypted: CreateActivationResponse = decrypt_response_object(exchange, &response)?;
        if decrypted.activation_id != result.activation_id {
            return Err(CoreError::invalid(
                "activationId",
                "encrypted activation id doesn't match received one",
            ));
        }

        let server_public_key = B64.decode(&decrypted.server_public_key)?;
        let master_secret = derive_master_secret(&device_keys, &server_public_key)?;
        let keys = derive_all_secret_keys(&master_secret)?;
        debug!(activation_id = %decrypted.activation_id, "signature keys derived");

        Ok(ActivationMaterial {
            activation_id: decrypted.activation_id,
            device_keys,
            server_public_key,
            keys,
            ctr_data: decrypted.ctr_data,
            recovery_data: decrypted.activation_recovery,
        })
    }

    /// Forget any pending or established activation.
    pub fn remove_activation(&mut self) {
        if !matches!(self.state, ActivationState::Idle) {
            info!(from = self.state.name(), "activation removed");
        }
        self.state = ActivationState::Idle;
    }

    /// Encryptor addressed to the master server key.
    pub fn encryptor_for_application_scope(&self, shared_info1: &str) -> CoreResult<Encryptor> {
        let public_key = B64.decode(&self.setup.master_server_public_key)?;
        let shared_info2 = application_scope_shared_info2(&self.setup.app_secret);
        Ok(Encryptor::new(&public_key, shared_info1.as_bytes(), &shared_info2)?)
    }

    /// Encryptor addressed to the activation's server key.
    pub fn encryptor_for_activation_scope(&self, shared_info1: &str) -> CoreResult<Encryptor> {
        let material = self
            .activation()
            .ok_or_else(|| CoreError::State("missing activation".into()))?;
        let shared_info2 =
            activation_scope_shared_info2(&material.keys.transport_key, &self.setup.app_secret)?;
        Ok(Encryptor::new(&material.server_public_key, shared_info1.as_bytes(), &shared_info2)?)
    }
}

#[cfg(feature = "dump-envelope-keys")]
fn dump_envelope_key(context: &str, key: &pa_crypto::EnvelopeKey) {
    debug!(
        context,
        enc_key = %hex::encode(key.enc_key()),
        mac_key = %hex::encode(key.mac_key()),
        iv_key = %hex::encode(key.iv_key()),
        ephemeral_public_key = %hex::encode(key.ephemeral_public_key()),
        "envelope key"
    );
}
