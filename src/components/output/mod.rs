pub mod seven_segment;
