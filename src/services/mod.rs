pub mod assembler;
pub mod certificates;

pub use assembler::{AssembledProgram, AssemblyError, DanglingReferencePolicy, ProgramAssembler};
pub use certificates::{
    CertificateError, CertificateService, IssueCertificateRequest, IssuedCertificate,
};
