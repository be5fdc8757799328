use std::sync::Arc;
use zeroize::Zeroizing;

use crate::{
    client::{
        device::DeviceShareStore,
        sharing::SecretSharing,
        transport::{CustodianTransport, SessionHandshake},
        wallet::Wallet,
    },
    crypto::{
        aes::{self, SecureKey},
        ecdh::{self, EphemeralKeyPair},
    },
    error::{AppError, Result},
};

/// Total shares produced at enrollment.
pub const SHARE_COUNT: u8 = 3;
/// Shares needed to rebuild the secret.
pub const THRESHOLD: u8 = 2;

/// The share handed to the user at enrollment.
pub struct RecoveryExport {
    share: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for RecoveryExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecoveryExport(..)")
    }
}

impl RecoveryExport {
    pub fn from_bytes(share: &[u8]) -> Self {
        Self {
            share: Zeroizing::new(share.to_vec()),
        }
    }

    pub fn from_hex(value: &str) -> Result<Self> {
        let share = hex::decode(value.trim())
            .map_err(|e| AppError::Validation(format!("Recovery export is not hex: {}", e)))?;
        Ok(Self {
            share: Zeroizing::new(share),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.share
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.share.as_slice()))
    }
}

/// Drives enrollment and recovery against a custodian.
///
/// Share 1 stays in the device store, share 2 is returned to the user, share 3
/// goes to the custodian. Every exchange with the custodian opens its own
/// session with a new ephemeral key pair.
pub struct RecoveryClient<T: CustodianTransport> {
    account: String,
    transport: T,
    sharing: Arc<dyn SecretSharing>,
    device: Arc<dyn DeviceShareStore>,
}

impl<T: CustodianTransport> RecoveryClient<T> {
    pub fn new(
        account: impl Into<String>,
        transport: T,
        sharing: Arc<dyn SecretSharing>,
        device: Arc<dyn DeviceShareStore>,
    ) -> Self {
        Self {
            account: account.into(),
            transport,
            sharing,
            device,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Opens a fresh session and derives its transport key.
    async fn handshake(&self) -> Result<(SessionHandshake, SecureKey)> {
        let key_pair = EphemeralKeyPair::generate();
        let handshake = self.transport.create_session(&key_pair.public_key_bytes()).await?;
        let server_key = ecdh::parse_public_key(&handshake.server_public_key)?;
        let transport_key = key_pair.agree(&server_key);
        Ok((handshake, transport_key))
    }

    /// Splits `master_secret` 2-of-3 and distributes the shares.
    ///
    /// The device share is only saved once the custodian has accepted its
    /// share, so a failed enrollment leaves the device untouched.
    pub async fn enroll(&self, master_secret: &[u8]) -> Result<RecoveryExport> {
        let (handshake, transport_key) = self.handshake().await?;

        let shares = self.sharing.split(master_secret, SHARE_COUNT, THRESHOLD)?;
        let [device_share, export_share, custodian_share] = <[Zeroizing<Vec<u8>>; 3]>::try_from(shares)
            .map_err(|s| AppError::Sharing(format!("expected 3 shares, got {}", s.len())))?;

        let sealed = aes::seal(&custodian_share, &transport_key)?;
        self.transport.upload_share(handshake.session_id, &sealed).await?;

        self.device.save(&self.account, &device_share).await?;
        tracing::info!("✅ Enrollment complete for account {}", self.account);

        Ok(RecoveryExport { share: export_share })
    }

    /// Generates a new secp256k1 signing key and enrolls it.
    pub async fn enroll_new_key(&self) -> Result<(Wallet, RecoveryExport)> {
        let wallet = Wallet::from_secret(&EphemeralKeyPair::generate().secret_bytes())?;
        let export = self.enroll(&wallet.secret_bytes()).await?;
        tracing::info!("🔑 New wallet {} enrolled", wallet.address());
        Ok((wallet, export))
    }

    /// Fetches the custodian's share over a brand-new session.
    async fn fetch_custodian_share(&self) -> Result<Zeroizing<Vec<u8>>> {
        let (handshake, transport_key) = self.handshake().await?;
        let sealed = self.transport.fetch_share(handshake.session_id).await?;
        aes::open(&sealed, &transport_key)
    }

    /// Rebuilds the master secret from the device share and the custodian's.
    pub async fn recover(&self) -> Result<Zeroizing<Vec<u8>>> {
        let device_share = self
            .device
            .load(&self.account)
            .await?
            .ok_or(AppError::DeviceShareMissing)?;
        let custodian_share = self.fetch_custodian_share().await?;

        let secret = self.sharing.combine(&[device_share.as_slice(), custodian_share.as_slice()])?;
        tracing::info!("✅ Secret recovered for account {}", self.account);
        Ok(secret)
    }

    /// Rebuilds the signing key and its address from the device share and the
    /// custodian's.
    pub async fn recover_wallet(&self) -> Result<Wallet> {
        let secret = self.recover().await?;
        Wallet::from_secret(&secret)
    }

    /// Rebuilds the master secret on a device that lost its share, from the
    /// recovery export and the custodian's share. The device share is
    /// restored from the export.
    pub async fn recover_with_export(&self, export: &RecoveryExport) -> Result<Zeroizing<Vec<u8>>> {
        let custodian_share = self.fetch_custodian_share().await?;

        let secret = self.sharing.combine(&[export.as_bytes(), custodian_share.as_slice()])?;
        self.device.save(&self.account, export.as_bytes()).await?;
        tracing::info!("✅ Secret recovered from export for account {}", self.account);
        Ok(secret)
    }

    /// Rebuilds the master secret without the custodian.
    pub async fn recover_offline(&self, export: &RecoveryExport) -> Result<Zeroizing<Vec<u8>>> {
        let device_share = self
            .device
            .load(&self.account)
            .await?
            .ok_or(AppError::DeviceShareMissing)?;
        self.sharing.combine(&[device_share.as_slice(), export.as_bytes()])
    }

    /// Erases custody and the device share. The account must enroll again.
    pub async fn reset(&self) -> Result<()> {
        self.transport.reset().await?;
        self.device.remove(&self.account).await?;
        tracing::info!("🗑️ Custody reset for account {}", self.account);
        Ok(())
    }

    /// Whether the custodian holds a share for this account.
    pub async fn is_enrolled(&self) -> Result<bool> {
        self.transport.is_configured().await
    }
}
