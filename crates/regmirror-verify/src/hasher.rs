use sha1::Digest as _;

pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

#[derive(Default)]
pub struct Sha1Hasher(sha1::Sha1);

impl Hasher for Sha1Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Sha1Hasher {
    pub fn new() -> Self { Self(sha1::Sha1::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha1::Sha1::digest(data).to_vec() }
}

#[derive(Default)]
pub struct Sha256Hasher(sha2::Sha256);

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Sha256Hasher {
    pub fn new() -> Self { Self(sha2::Sha256::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha2::Sha256::digest(data).to_vec() }
}

#[derive(Default)]
pub struct Sha512Hasher(sha2::Sha512);

impl Hasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Sha512Hasher {
    pub fn new() -> Self { Self(sha2::Sha512::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha2::Sha512::digest(data).to_vec() }
}
