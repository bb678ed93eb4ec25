mod atr;
mod capability;
mod card;
mod layout;
mod page;
mod trailer;
mod version;

use std::fmt::Display;

pub use atr::Atr;
pub use capability::CapabilityContainer;
pub use card::{AddressScheme, CardIdentity, CardProfile, CardType, Protocol};
pub use layout::{DataArea, PasswordLayout};
pub use page::{PageWrite, PageWriteResult};
use serde::Serializer;
pub use trailer::SectorTrailer;
pub use version::VersionInfo;

pub(crate) fn serialize_display<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub(crate) fn serialize_hex<T: AsRef<[u8]>, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(value))
}
