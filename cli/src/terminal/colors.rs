use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 102, g: 204, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 204, b: 102 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const IPV4_ADDR: Color = Color::TrueColor { r: 120, g: 220, b: 160 };
pub const IPV6_ADDR: Color = Color::TrueColor { r: 170, g: 150, b: 255 };

pub const ROLE_APP: Color = Color::TrueColor { r: 110, g: 200, b: 250 };
pub const ROLE_SQL: Color = Color::TrueColor { r: 250, g: 180, b: 90 };
pub const ROLE_CTX: Color = Color::TrueColor { r: 200, g: 130, b: 250 };

pub const PORT_OPEN: Color = Color::Green;
pub const ERROR: Color = Color::Red;
