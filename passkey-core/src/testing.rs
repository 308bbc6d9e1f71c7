//! Software authenticator for driving ceremonies in tests
//!
//! Holds a real ES256 or RS256 key pair and produces the byte structures a
//! browser would hand back: attestation objects (fmt `none`), assertions and
//! `clientDataJSON`.

use ciborium::value::Value;
use p256::ecdsa::SigningKey as P256SigningKey;
use rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};

use crate::authenticator_data::AuthenticatorFlags;
use crate::cose::{serialize_public_key, CoseKey};
use crate::encoding::{base64_url_encode, Base64UrlBytes};
use crate::options::{CreationOptions, RequestOptions};
use crate::response::{
    AssertionResponse, AttestationResponse, AuthenticationResponse, RegistrationResponse,
};

/// User present and user verified
pub const FLAGS_UP_UV: u8 = AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED;

enum KeyPair {
    Es256(P256SigningKey),
    Rs256(Box<RsaPrivateKey>),
}

pub struct SoftAuthenticator {
    key: KeyPair,
    credential_id: Vec<u8>,
}

impl SoftAuthenticator {
    pub fn es256() -> Self {
        Self::with_key(KeyPair::Es256(P256SigningKey::random(&mut OsRng)))
    }

    pub fn rs256() -> Self {
        let key = RsaPrivateKey::new(&mut OsRng, 2048).expect("RSA key generation");
        Self::with_key(KeyPair::Rs256(Box::new(key)))
    }

    fn with_key(key: KeyPair) -> Self {
        let mut credential_id = vec![0u8; 32];
        getrandom::getrandom(&mut credential_id).expect("random credential id");
        Self { key, credential_id }
    }

    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    pub fn cose_key(&self) -> CoseKey {
        match &self.key {
            KeyPair::Es256(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                let mut x = [0u8; 32];
                let mut y = [0u8; 32];
                x.copy_from_slice(point.x().expect("uncompressed point"));
                y.copy_from_slice(point.y().expect("uncompressed point"));
                CoseKey::Es256 { x, y }
            }
            KeyPair::Rs256(key) => CoseKey::Rs256 {
                n: key.n().to_bytes_be(),
                e: key.e().to_bytes_be(),
            },
        }
    }

    /// DER ECDSA signature or PKCS#1 v1.5 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.key {
            KeyPair::Es256(key) => {
                use p256::ecdsa::signature::Signer;
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_der().as_bytes().to_vec()
            }
            KeyPair::Rs256(key) => {
                use rsa::signature::{SignatureEncoding, Signer};
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new((**key).clone());
                signing_key.sign(message).to_vec()
            }
        }
    }

    /// Authenticator data with attested credential data; the AT flag is
    /// always set.
    pub fn registration_authenticator_data(
        &self,
        rp_id_hash: &[u8; 32],
        flags: u8,
        counter: u32,
    ) -> Vec<u8> {
        let public_key = serialize_public_key(&self.cose_key()).expect("COSE encoding");
        let mut attested = Vec::new();
        attested.extend_from_slice(&[0u8; 16]);
        attested.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        attested.extend_from_slice(&self.credential_id);
        attested.extend_from_slice(&public_key);

        authenticator_data(
            rp_id_hash,
            flags | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            counter,
            Some(attested.as_slice()),
        )
    }

    /// Registration response with full control over what gets signed.
    pub fn attest(
        &self,
        rp_id: &str,
        challenge: &[u8],
        origin: &str,
        flags: u8,
        counter: u32,
    ) -> RegistrationResponse {
        let auth_data = self.registration_authenticator_data(&rp_id_hash(rp_id), flags, counter);

        RegistrationResponse {
            id: base64_url_encode(&self.credential_id),
            raw_id: Some(Base64UrlBytes(self.credential_id.clone())),
            type_: "public-key".into(),
            response: AttestationResponse {
                client_data_json: Base64UrlBytes(client_data_json(
                    "webauthn.create",
                    challenge,
                    origin,
                )),
                attestation_object: Base64UrlBytes(attestation_object("none", auth_data)),
                transports: Vec::new(),
            },
        }
    }

    /// Answer creation options the way a well-behaved authenticator would.
    pub fn register(&self, options: &CreationOptions, origin: &str) -> RegistrationResponse {
        self.attest(
            &options.rp.id,
            options.challenge.as_slice(),
            origin,
            FLAGS_UP_UV,
            0,
        )
    }

    /// Assertion response with full control over what gets signed.
    pub fn sign_assertion(
        &self,
        rp_id: &str,
        challenge: &[u8],
        origin: &str,
        flags: u8,
        counter: u32,
    ) -> AuthenticationResponse {
        let auth_data = authenticator_data(&rp_id_hash(rp_id), flags, counter, None);
        let client_data = client_data_json("webauthn.get", challenge, origin);

        let mut message = auth_data.clone();
        message.extend_from_slice(&Sha256::digest(&client_data));
        let signature = self.sign(&message);

        AuthenticationResponse {
            id: base64_url_encode(&self.credential_id),
            raw_id: Some(Base64UrlBytes(self.credential_id.clone())),
            type_: "public-key".into(),
            response: AssertionResponse {
                client_data_json: Base64UrlBytes(client_data),
                authenticator_data: Base64UrlBytes(auth_data),
                signature: Base64UrlBytes(signature),
                user_handle: None,
            },
        }
    }

    /// Answer request options with the given counter.
    pub fn authenticate(
        &self,
        options: &RequestOptions,
        origin: &str,
        counter: u32,
    ) -> AuthenticationResponse {
        self.sign_assertion(
            &options.rp_id,
            options.challenge.as_slice(),
            origin,
            FLAGS_UP_UV,
            counter,
        )
    }
}

pub fn rp_id_hash(rp_id: &str) -> [u8; 32] {
    Sha256::digest(rp_id.as_bytes()).into()
}

/// Raw authenticator data. `attested` is appended verbatim after the
/// counter.
pub fn authenticator_data(
    rp_id_hash: &[u8; 32],
    flags: u8,
    counter: u32,
    attested: Option<&[u8]>,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(37);
    bytes.extend_from_slice(rp_id_hash);
    bytes.push(flags);
    bytes.extend_from_slice(&counter.to_be_bytes());
    if let Some(attested) = attested {
        bytes.extend_from_slice(attested);
    }
    bytes
}

pub fn attestation_object(fmt: &str, auth_data: Vec<u8>) -> Vec<u8> {
    let value = Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text(fmt.into())),
        (Value::Text("attStmt".into()), Value::Map(Vec::new())),
        (Value::Text("authData".into()), Value::Bytes(auth_data)),
    ]);
    let mut bytes = Vec::new();
    ciborium::into_writer(&value, &mut bytes).expect("CBOR encoding");
    bytes
}

pub fn client_data_json(type_: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    serde_json::json!({
        "type": type_,
        "challenge": base64_url_encode(challenge),
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}
