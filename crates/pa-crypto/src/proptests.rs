#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::cipher::{aes128_cbc_decrypt, aes128_cbc_encrypt};
    use crate::ec::KeyPair;
    use crate::envelope::{Decryptor, Encryptor};
    use crate::error::CryptoError;
    use crate::kdf::{aes_kdf, kdf_x963_sha256, reduce_shared_secret};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_ecies_round_trip(
            request in any::<Vec<u8>>(),
            response in any::<Vec<u8>>(),
            info1 in any::<Vec<u8>>(),
            info2 in any::<Vec<u8>>(),
        ) {
            let server = KeyPair::generate();
            let encryptor = Encryptor::new(&server.public_key(true), &info1, &info2).unwrap();
            let decryptor = Decryptor::from_key_pair(server, &info1, &info2);

            let (cryptogram, pending) = encryptor.encrypt_request(&request).unwrap();
            let (plaintext, responder) = decryptor.decrypt_request(&cryptogram).unwrap();
            prop_assert_eq!(&plaintext, &request);

            let reply = responder.encrypt_response(&response).unwrap();
            prop_assert_eq!(pending.decrypt_response(&reply).unwrap(), response);
        }

        #[test]
        fn test_bit_flip_never_decrypts(
            data in proptest::collection::vec(any::<u8>(), 0..64),
            flip_in_mac in any::<bool>(),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let server = KeyPair::generate();
            let encryptor = Encryptor::new(
                &server.public_key(true),
                b"/pa/generic/application",
                b"sh2",
            )
            .unwrap();
            let (mut cryptogram, _) = encryptor.encrypt_request(&data).unwrap();

            let target = if flip_in_mac { &mut cryptogram.mac } else { &mut cryptogram.body };
            let i = position.index(target.len());
            target[i] ^= 1 << bit;

            let decryptor = Decryptor::from_key_pair(server, b"/pa/generic/application", b"sh2");
            prop_assert!(matches!(
                decryptor.decrypt_request(&cryptogram),
                Err(CryptoError::Authentication)
            ));
        }

        #[test]
        fn test_reduce_is_xor_of_halves(secret in proptest::array::uniform32(any::<u8>())) {
            let reduced = reduce_shared_secret(&secret).unwrap();
            for i in 0..16 {
                prop_assert_eq!(reduced[i], secret[i] ^ secret[i + 16]);
            }
        }

        #[test]
        fn test_x963_output_length(
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            info in any::<Vec<u8>>(),
            len in 0usize..200,
        ) {
            prop_assert_eq!(kdf_x963_sha256(&secret, &info, len).len(), len);
        }

        #[test]
        fn test_aes_kdf_distinct_indices(
            secret in proptest::array::uniform16(any::<u8>()),
            a in any::<u32>(),
            b in any::<u32>(),
        ) {
            prop_assume!(a != b);
            // AES is a permutation, so distinct input blocks map to distinct outputs.
            prop_assert_ne!(aes_kdf(&secret, a).unwrap(), aes_kdf(&secret, b).unwrap());
            prop_assert_eq!(aes_kdf(&secret, a).unwrap(), aes_kdf(&secret, a).unwrap());
        }

        #[test]
        fn test_cbc_round_trip(
            key in proptest::array::uniform16(any::<u8>()),
            iv in proptest::array::uniform16(any::<u8>()),
            data in any::<Vec<u8>>(),
        ) {
            let ct = aes128_cbc_encrypt(&key, &iv, &data).unwrap();
            prop_assert_eq!(ct.len(), (data.len() / 16 + 1) * 16);
            prop_assert_eq!(aes128_cbc_decrypt(&key, &iv, &ct).unwrap(), data);
        }
    }
}
