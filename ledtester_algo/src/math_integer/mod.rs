pub mod ohms_law;
