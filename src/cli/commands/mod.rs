pub mod assemble;
pub mod certificate;
pub mod fixture;
