/// Execution classes used for task scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Sequential consumer draining an accessor's inbound stream.
	Pipeline,
	/// Reader/writer pumps bridging a byte stream to message channels.
	ChannelIo,
	/// CPU-bound payload decoding executed on the blocking pool.
	Decode,
	/// Backend work answering requests on the far side of a channel.
	Backend,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Pipeline => "pipeline",
			Self::ChannelIo => "channel_io",
			Self::Decode => "decode",
			Self::Backend => "backend",
		}
	}
}
