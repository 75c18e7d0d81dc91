mod sim_desc;

pub use sim_desc::AudioSimDesc;
