pub mod run_worker;
