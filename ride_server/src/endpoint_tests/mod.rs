mod helpers;
mod requests;
mod rides;
mod workers;
