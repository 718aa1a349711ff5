//! A fountain of rainbow dots. Dots are launched from the bottom of a drawing surface, arc
//! under gravity and are coloured by where they are across the surface. The drawing surface is
//! either the user's terminal, or an external host speaking JSON over STDIN/STDOUT.

pub mod cli_args;
/// All the user-configurable settings.
pub mod config {
    pub mod input;
    pub mod main;
}
pub mod colour_cycle;
pub mod engine;
pub mod headless;
pub mod input;
pub mod particle;
pub mod particle_store;
pub mod physics;
pub mod recorder;
pub mod renderer;
pub mod run;
pub mod spawner;
pub mod surface;
pub mod terminal;
