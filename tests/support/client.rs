//! The client half of a session.

use pass_secret_service::core::constants::ALGORITHM_DH;
use pass_secret_service::core::crypto::{self, dh, AesKey};
use pass_secret_service::core::session::SessionOutput;
use pass_secret_service::core::types::Secret;
use pass_secret_service::Service;

/// A keyed session as the client sees it.
pub struct Client {
    pub session: String,
    key: AesKey,
}

impl Client {
    /// Run the DH exchange against `service`.
    pub async fn open(service: &Service) -> Self {
        let private = dh::generate_private();
        let public = dh::to_group_bytes(&dh::public_key(&private)).unwrap();

        let (output, session) = service.open_session(ALGORITHM_DH, &public).await.unwrap();
        let SessionOutput::PublicKey(server) = output else {
            panic!("expected a public key, got {:?}", output);
        };
        assert_eq!(server.len(), dh::GROUP_LEN);

        let key = dh::derive_key(&dh::shared_secret(&server, &private)).unwrap();
        Self { session, key }
    }

    pub fn key(&self) -> &AesKey {
        &self.key
    }

    /// Encrypt `password` the way a client would before `SetSecret`.
    pub fn encode(&self, password: &str) -> Secret {
        let (iv, payload) = crypto::encode(Some(&self.key), password).unwrap();
        Secret::new(self.session.as_str(), iv, payload)
    }

    /// Decrypt a secret returned by `GetSecret`.
    pub fn decode(&self, secret: &Secret) -> String {
        assert_eq!(secret.session, self.session);
        crypto::decode(Some(&self.key), &secret.parameters, &secret.value)
            .unwrap()
            .to_string()
    }
}

/// An unencrypted secret for a plain session.
pub fn plain_secret(session: &str, password: &str) -> Secret {
    Secret::new(session, Vec::new(), password.as_bytes().to_vec())
}
