mod lifecycle_tests;
mod verification_tests;
