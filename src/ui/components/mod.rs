pub mod command_overlay;
