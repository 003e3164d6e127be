mod crossing;
mod level;
mod reprojection;
mod scheduler;
mod utils;
