pub mod health;
pub mod sensor;
