pub mod course;

pub use course::{CertifiedStatus, CourseRecord};
