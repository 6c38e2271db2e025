//! In-process stand-in for the PowerAuth server.
//!
//! Provides the server half of the activation exchange and of later ECIES
//! channels, so the mobile client can be exercised without a running server.
//! Identifiers are derived from key material and are not meant to be secret.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use tracing::{debug, info};

use pa_crypto::{
    derive_all_secret_keys, hash::sha256, protocol::derive_master_secret, utils::concat, Decryptor,
    KeyPair, SignatureKeys,
};

use crate::{
    client::{
        activation_scope_shared_info2, application_scope_shared_info2, ActivationPrepareResult,
        ActivationRequestPayload, ActivationStatus, CreateActivationData, CreateActivationResponse,
        MobileClient, ACTIVATION_SHARED_INFO1,
    },
    config::ApplicationSetup,
    cryptogram::{decrypt_request_object, encrypt_response_object, EncryptedRequest},
    errors::{CoreError, CoreResult},
};

/// Server-side record of one activation.
#[derive(Debug, Clone)]
pub struct ServerActivation {
    pub activation_id: String,
    pub user_id: String,
    pub status: ActivationStatus,
    pub device_public_key: Vec<u8>,
    pub server_keys: KeyPair,
    pub keys: SignatureKeys,
    pub request: CreateActivationData,
}

#[derive(Debug)]
pub struct ServerSimulator {
    application_id: String,
    master_keys: KeyPair,
    setup: ApplicationSetup,
    activations: HashMap<String, ServerActivation>,
}

impl ServerSimulator {
    /// Simulator with a freshly generated master key pair.
    pub fn new(app_key: &str, app_secret: &str) -> Self {
        Self::with_master_keys(KeyPair::generate(), app_key, app_secret)
    }

    pub fn with_master_keys(master_keys: KeyPair, app_key: &str, app_secret: &str) -> Self {
        let setup = ApplicationSetup {
            app_key: app_key.to_string(),
            app_secret: app_secret.to_string(),
            master_server_public_key: B64.encode(master_keys.public_key(true)),
        };
        Self {
            application_id: hex::encode(&sha256(app_key.as_bytes())[..4]),
            master_keys,
            setup,
            activations: HashMap::new(),
        }
    }

    /// What a client needs to talk to this server.
    pub fn setup(&self) -> &ApplicationSetup {
        &self.setup
    }

    pub fn activation(&self, activation_id: &str) -> Option<&ServerActivation> {
        self.activations.get(activation_id)
    }

    fn activation_mut(&mut self, activation_id: &str) -> CoreResult<&mut ServerActivation> {
        self.activations
            .get_mut(activation_id)
            .ok_or_else(|| unknown_activation(activation_id))
    }

    /// Decryptor for application-scope requests.
    pub fn decryptor_for_application_scope(&self, shared_info1: &str) -> Decryptor {
        let shared_info2 = application_scope_shared_info2(&self.setup.app_secret);
        Decryptor::from_key_pair(self.master_keys.clone(), shared_info1.as_bytes(), &shared_info2)
    }

    /// Decryptor for activation-scope requests of an established activation.
    pub fn decryptor_for_activation_scope(
        &self,
        activation_id: &str,
        shared_info1: &str,
    ) -> CoreResult<Decryptor> {
        let activation = self
            .activation(activation_id)
            .ok_or_else(|| unknown_activation(activation_id))?;
        if activation.status != ActivationStatus::Active {
            return Err(CoreError::State(format!("activation {activation_id} is not active")));
        }
        let shared_info2 =
            activation_scope_shared_info2(&activation.keys.transport_key, &self.setup.app_secret)?;
        Ok(Decryptor::from_key_pair(
            activation.server_keys.clone(),
            shared_info1.as_bytes(),
            &shared_info2,
        ))
    }

    /// Handle an activation request: key exchange and encrypted answer.
    pub fn prepare_activation(
        &mut self,
        user_id: &str,
        request: &EncryptedRequest,
    ) -> CoreResult<ActivationPrepareResult> {
        let decryptor = self.decryptor_for_application_scope(ACTIVATION_SHARED_INFO1);
        let (payload, responder): (ActivationRequestPayload, _) =
            decrypt_request_object(decryptor, request)?;

        let device_public_key = B64.decode(&payload.device_public_key)?;
        let server_keys = KeyPair::generate();
        let master_secret = derive_master_secret(&server_keys, &device_public_key)?;
        let keys = derive_all_secret_keys(&master_secret)?;

        let server_public_key = server_keys.public_key(true);
        let activation_id = activation_id_for(&server_public_key);
        let ctr_seed = concat(&[b"ctr".as_slice(), server_public_key.as_slice()]);
        let ctr_data = B64.encode(&sha256(&ctr_seed)[..16]);

        let response = CreateActivationResponse {
            activation_id: activation_id.clone(),
            server_public_key: B64.encode(&server_public_key),
            ctr_data,
            activation_recovery: None,
        };
        let encrypted = encrypt_response_object(responder, &response)?;

        info!(%activation_id, user_id, name = %payload.data.activation_name, "activation prepared");
        self.activations.insert(
            activation_id.clone(),
            ServerActivation {
                activation_id: activation_id.clone(),
                user_id: user_id.to_string(),
                status: ActivationStatus::PendingCommit,
                device_public_key,
                server_keys,
                keys,
                request: payload.data,
            },
        );

        Ok(ActivationPrepareResult {
            application_id: self.application_id.clone(),
            activation_id,
            activation_status: ActivationStatus::PendingCommit,
            user_id: user_id.to_string(),
            encrypted_data: encrypted.encrypted_data,
            mac: encrypted.mac,
        })
    }

    /// Move a prepared activation to `ACTIVE`.
    pub fn commit_activation(&mut self, activation_id: &str) -> CoreResult<()> {
        let activation = self.activation_mut(activation_id)?;
        if activation.status != ActivationStatus::PendingCommit {
            return Err(CoreError::State(format!(
                "activation {activation_id} is {:?}, expected PendingCommit",
                activation.status
            )));
        }
        activation.status = ActivationStatus::Active;
        debug!(activation_id, "activation committed");
        Ok(())
    }

    /// Block an active activation. Activation-scope channels are refused
    /// until it is unblocked.
    pub fn block_activation(&mut self, activation_id: &str) -> CoreResult<()> {
        let activation = self.activation_mut(activation_id)?;
        if activation.status != ActivationStatus::Active {
            return Err(CoreError::State(format!(
                "activation {activation_id} is {:?}, expected Active",
                activation.status
            )));
        }
        activation.status = ActivationStatus::Blocked;
        info!(activation_id, "activation blocked");
        Ok(())
    }

    pub fn unblock_activation(&mut self, activation_id: &str) -> CoreResult<()> {
        let activation = self.activation_mut(activation_id)?;
        if activation.status != ActivationStatus::Blocked {
            return Err(CoreError::State(format!(
                "activation {activation_id} is {:?}, expected Blocked",
                activation.status
            )));
        }
        activation.status = ActivationStatus::Active;
        Ok(())
    }

    pub fn remove_activation(&mut self, activation_id: &str) -> CoreResult<()> {
        self.activation_mut(activation_id)?.status = ActivationStatus::Removed;
        Ok(())
    }
}

fn unknown_activation(activation_id: &str) -> CoreError {
    CoreError::invalid("activationId", format!("unknown activation {activation_id}"))
}

/// UUID-shaped identifier derived from the activation's server key.
fn activation_id_for(server_public_key: &[u8]) -> String {
    let h = hex::encode(&sha256(server_public_key)[..16]);
    format!("{}-{}-{}-{}-{}", &h[..8], &h[8..12], &h[12..16], &h[16..20], &h[20..])
}

/// Run a complete activation between `client` and `server`.
///
/// Returns the activation id once both sides hold the activation.
pub fn run_activation_flow(
    client: &mut MobileClient,
    server: &mut ServerSimulator,
    user_id: &str,
    data: &CreateActivationData,
) -> CoreResult<String> {
    let request = client.create_activation(data)?;
    let prepared = server.prepare_activation(user_id, &request)?;
    client.commit_activation(&prepared)?;
    server.commit_activation(&prepared.activation_id)?;
    Ok(prepared.activation_id)
}
