pub mod record_a_mammogram;
