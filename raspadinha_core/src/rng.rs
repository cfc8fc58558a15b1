use hmac::{Hmac, Mac};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::Sha256;

// Provably-fair draws: HMAC-SHA256(server_seed, "client_seed:nonce") -> bytes -> floats in [0,1).
// The server publishes sha256(server_seed) before play and reveals the seed on rotation.

pub type HmacSha256 = Hmac<Sha256>;

pub trait DrawSource {
    fn next_unit(&mut self) -> f64;
}

pub fn derive_hash(input: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    hex::encode(derive_hash(input))
}

fn unit_from_chunk(chunk: &[u8]) -> f64 {
    let v = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    (v as f64) / (u32::MAX as f64 + 1.0)
}

pub fn derive_floats(hmac_bytes: &[u8], count: usize) -> Vec<f64> {
    let mut draws = FairDraws::from_bytes(hmac_bytes.to_vec());
    (0..count).map(|_| draws.next_unit()).collect()
}

#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    pub server_seed: String, // secret
    pub client_seed: String,
    pub nonce: u64,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
        }
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    pub fn hmac_bytes(&self) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(self.server_seed.as_bytes())
            .expect("HMAC accepts keys of any length");
        let msg = format!("{}:{}", self.client_seed, self.nonce);
        mac.update(msg.as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    pub fn next_floats(&self, count: usize) -> Vec<f64> {
        derive_floats(&self.hmac_bytes(), count)
    }

    pub fn stream(&self) -> FairDraws {
        FairDraws::from_bytes(self.hmac_bytes().to_vec())
    }
}

/// Float stream over HMAC output. Successive 4-byte chunks map to `[0,1)`;
/// an exhausted buffer is replaced by its own sha256.
#[derive(Debug, Clone)]
pub struct FairDraws {
    buffer: Vec<u8>,
    pos: usize,
}

impl FairDraws {
    fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer, pos: 0 }
    }
}

impl DrawSource for FairDraws {
    fn next_unit(&mut self) -> f64 {
        if self.pos + 4 > self.buffer.len() {
            self.buffer = derive_hash(&self.buffer).to_vec();
            self.pos = 0;
        }
        let f = unit_from_chunk(&self.buffer[self.pos..self.pos + 4]);
        self.pos += 4;
        f
    }
}

#[derive(Debug, Clone)]
pub struct RngDraws<R>(pub R);

impl RngDraws<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DrawSource for RngDraws<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Replays a fixed list of draws, cycling when exhausted. An empty script yields 0.0.
#[derive(Debug, Clone)]
pub struct ScriptedDraws {
    script: Vec<f64>,
    pos: usize,
}

impl ScriptedDraws {
    pub fn new(script: impl Into<Vec<f64>>) -> Self {
        Self {
            script: script.into(),
            pos: 0,
        }
    }
}

impl DrawSource for ScriptedDraws {
    fn next_unit(&mut self) -> f64 {
        if self.script.is_empty() {
            return 0.0;
        }
        let f = self.script[self.pos % self.script.len()];
        self.pos += 1;
        f
    }
}
