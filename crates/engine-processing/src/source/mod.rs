pub mod csv_lines;
