#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use crate::header::{parse_signature_header, parse_token_header};
    use crate::offline::{parse_offline_data, SigningKey};
    use crate::signature::normalize_get_params;

    // Header values never contain quotes or the ", " separator.
    fn header_value() -> impl Strategy<Value = String> {
        "[A-Za-z0-9+/=_.-]{1,40}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_signature_header_fields_survive(
            version in header_value(),
            activation_id in header_value(),
            nonce in header_value(),
            signature_type in "[a-z_]{1,30}",
            signature in header_value(),
        ) {
            let header = format!(
                "PowerAuth pa_version=\"{version}\", pa_activation_id=\"{activation_id}\", pa_nonce=\"{nonce}\", pa_signature_type=\"{signature_type}\", pa_signature=\"{signature}\""
            );
            let parsed = parse_signature_header(&header, "app").unwrap();
            prop_assert_eq!(parsed.signature_version, version);
            prop_assert_eq!(parsed.activation_id, activation_id);
            prop_assert_eq!(parsed.nonce, nonce);
            prop_assert_eq!(parsed.signature_type, signature_type.to_uppercase());
            prop_assert_eq!(parsed.signature, signature);
        }

        #[test]
        fn test_token_timestamp_round_trip(timestamp in any::<i64>(), token_id in header_value()) {
            let header = format!(
                "PowerAuth version=\"3.1\", token_id=\"{token_id}\", token_digest=\"d\", nonce=\"n\", timestamp=\"{timestamp}\""
            );
            let parsed = parse_token_header(&header).unwrap();
            prop_assert_eq!(parsed.timestamp, timestamp);
            prop_assert_eq!(parsed.token_id, token_id);
        }

        #[test]
        fn test_offline_signed_data_reconstruction(
            lines in proptest::collection::vec("[^\n]{0,20}", 1..5),
            nonce in "[A-Za-z0-9+/=]{1,24}",
            master in any::<bool>(),
            signature in "[^\n]{0,40}",
        ) {
            let key = if master { '0' } else { '1' };
            let payload = lines.join("\n");
            let offline = format!("{payload}\n{nonce}\n{key}{signature}");
            let parsed = parse_offline_data(&offline).unwrap().unwrap();
            prop_assert_eq!(&parsed.data, &payload);
            prop_assert_eq!(&parsed.nonce, &nonce);
            prop_assert_eq!(parsed.signing_key.as_char(), key);
            prop_assert_eq!(parsed.signing_key == SigningKey::ServerMasterPrivate, master);
            prop_assert_eq!(&parsed.signature, &signature);
            prop_assert_eq!(parsed.signed_data, format!("{payload}\n{nonce}\n{key}"));
        }

        #[test]
        fn test_get_params_pair_count(
            params in proptest::collection::btree_map("[a-z]{1,8}", "[ -~]{0,12}", 0..8),
        ) {
            let params: BTreeMap<String, String> = params;
            let normalized = normalize_get_params(Some(&params));
            if params.is_empty() {
                prop_assert_eq!(normalized, "");
            } else {
                // Encoded keys and values never contain '&' or '='.
                prop_assert_eq!(normalized.split('&').count(), params.len());
                prop_assert!(normalized.split('&').all(|pair| pair.matches('=').count() == 1));
            }
        }
    }
}
