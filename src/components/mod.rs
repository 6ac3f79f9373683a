pub mod week_grid;
