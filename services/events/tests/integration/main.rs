mod lifecycle_test;
mod monitoring_test;
mod worker_test;
