//! Typed wrappers over configured child services.

pub mod amap;

pub use amap::{AmapClient, LiveWeather, WeatherInfo};
