//! `weeb-reviews` — contact-form reviews.
//!
//! Submissions are anonymous; there is no owner. The satisfaction prediction
//! is attached by the intake service, never by the client.

pub mod review;

pub use review::{NewReview, Review, ReviewSubmission};
