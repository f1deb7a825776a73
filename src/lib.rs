//! GeneGL: a real-time point-cloud viewer for a simulated plant population.
//!
//! Every frame the newest published [`ecosystem::Ecosystem`] is walked
//! without blocking the simulation, flattened into position/color streams,
//! streamed to the GPU and drawn as one square per cell under a pan/zoom
//! camera, with a small status overlay on top.
//!
//! Only one [`renderer::Renderer`] may be alive per process; a second one
//! fails with [`error::RenderInitError::AlreadyRunning`].

pub mod app;
pub mod camera;
pub mod collector;
pub mod config;
pub mod constants;
pub mod ecosystem;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod hud;
pub mod input;
pub mod logging;
pub mod palette;
pub mod renderer;
pub mod simulation;
pub mod streaming;
pub mod utils;
