//! Low-level helpers for reading and writing Office Open XML packages.
pub(crate) mod xml;
pub(crate) mod zip;
