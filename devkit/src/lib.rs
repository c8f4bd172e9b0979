/*!
# Pool Party DevKit - Stubs and fixtures for development

Support library for testing the pool monitor without real Glances agents:
- Scripted agent stub serving `/api/3/fs` on a loopback port
- Drive fixtures shaped like Glances filesystem entries
*/

pub mod agent_stub;
pub mod fixtures;

pub use agent_stub::{unused_port, AgentReply, MockAgent, RecordedRequest};
pub use fixtures::{drive, drive_list};
