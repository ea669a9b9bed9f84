pub mod hp_display_latch;
