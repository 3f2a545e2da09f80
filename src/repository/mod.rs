pub mod bookings;
pub mod table_service;
