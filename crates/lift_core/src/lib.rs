pub mod broadcast;
pub mod clock;
pub mod driver;
pub mod ecs;
pub mod engine;
pub mod requests;
pub mod runner;
pub mod scenario;
pub mod scoring;
pub mod spawner;
pub mod systems;
pub mod telemetry;
