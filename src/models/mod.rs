pub mod feishu;
pub mod forecast;
pub mod qweather;
