//! pa-demo: exercise the PowerAuth harness from the command line

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pa_core::{
    cryptogram::{
        decrypt_request_object, decrypt_response_object, encrypt_request_object,
        encrypt_response_object,
    },
    harness::run_activation_flow,
    offline::SignedOfflinePayload,
    signature::normalize_online_data,
    CreateActivationData, HarnessConfig, MobileClient, ServerSimulator,
};
use pa_crypto::KeyPair;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage:");
        eprintln!("  pa-demo keygen");
        eprintln!("  pa-demo selftest");
        eprintln!("  pa-demo config");
        eprintln!("  pa-demo parse-header <header> [app_key]");
        eprintln!("  pa-demo parse-offline <offline_data with \\n escapes>");
        eprintln!("  pa-demo normalize <method> <uri_id> <nonce_b64> [body]");
        std::process::exit(2);
    }
    match args[1].as_str() {
        "keygen" => keygen(),
        "selftest" => selftest(),
        "config" => {
            let config = HarnessConfig::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        "parse-header" => {
            let header = args.get(2).context("missing header")?;
            let app_key = args.get(3).map(String::as_str).unwrap_or("");
            parse_header(header, app_key)
        }
        "parse-offline" => {
            let data = args.get(2).context("missing offline_data")?;
            let payload = SignedOfflinePayload::new(data.replace("\\n", "\n"), "").parse()?;
            match payload.parsed {
                Some(parsed) => println!("{}", serde_json::to_string_pretty(&parsed)?),
                None => println!("NOT_PARSED (two lines or fewer)"),
            }
            Ok(())
        }
        "normalize" => {
            let method = args.get(2).context("missing method")?;
            let uri_id = args.get(3).context("missing uri_id")?;
            let nonce = args.get(4).context("missing nonce_b64")?;
            let body = args.get(5).map(String::as_str);
            println!("{}", normalize_online_data(method, uri_id, body, nonce));
            Ok(())
        }
        _ => {
            anyhow::bail!("unknown mode");
        }
    }
}

fn keygen() -> anyhow::Result<()> {
    let pair = KeyPair::generate();
    println!("PRIVATE_KEY_B64={}", B64.encode(pair.private_key().as_slice()));
    println!("PUBLIC_KEY_B64={}", B64.encode(pair.public_key(true)));
    Ok(())
}

fn parse_header(header: &str, app_key: &str) -> anyhow::Result<()> {
    let json = if header.contains("token_id=") {
        serde_json::to_string_pretty(&pa_core::parse_token_header(header)?)?
    } else {
        serde_json::to_string_pretty(&pa_core::parse_signature_header(header, app_key)?)?
    };
    println!("{json}");
    Ok(())
}

/// Activate a simulated device against the in-process server and open one
/// activation-scope channel.
fn selftest() -> anyhow::Result<()> {
    let config = HarnessConfig::load()?;
    let mut server = ServerSimulator::new(&config.application.application_name, "selftest-secret");
    let mut client = MobileClient::new(server.setup().clone());

    let data = CreateActivationData {
        activation_name: "pa-demo".to_string(),
        platform: "unknown".to_string(),
        device_info: std::env::consts::OS.to_string(),
        extras: None,
        activation_otp: None,
    };
    let user_id = &config.test_user.user_id;
    let activation_id = run_activation_flow(&mut client, &mut server, user_id, &data)
        .context("activation failed")?;
    println!("ACTIVATION_ID={activation_id}");

    let device = client.activation().context("client has no activation")?;
    let record = server.activation(&activation_id).context("server has no activation")?;
    anyhow::ensure!(device.keys == record.keys, "signature keys differ");
    println!("KEYS_MATCH=true");

    let encryptor = client.encryptor_for_activation_scope("/pa/vault/unlock")?;
    let decryptor = server.decryptor_for_activation_scope(&activation_id, "/pa/vault/unlock")?;
    let (request, pending) =
        encrypt_request_object(encryptor, &serde_json::json!({ "reason": "selftest" }))?;
    let (body, responder): (serde_json::Value, _) = decrypt_request_object(decryptor, &request)?;
    info!(%body, "server received vault unlock request");
    let response = encrypt_response_object(
        responder,
        &serde_json::json!({ "encryptedVaultEncryptionKey": B64.encode(record.keys.vault_key) }),
    )?;
    let reply: serde_json::Value = decrypt_response_object(pending, &response)?;
    println!("VAULT_REPLY={reply}");
    println!("VAULT_KEY_HEX={}", hex::encode(device.keys.vault_key));
    Ok(())
}
