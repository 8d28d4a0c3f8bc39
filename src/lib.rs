/*!
The music sequencing core behind the Cantilena editor.

Everything here runs headless: the library knows nothing about windows,
files or audio hardware. It converts MIDI bytes to and from an in-memory
note model ([`midi`]), owns tracks and their mix state ([`mixer`]), maps
screen space to note edits ([`roll`]), and turns a moving clock into
note-on/note-off events for a host audio engine ([`transport`]). The
[`snapshot`] types are the plain data handed across the persistence
boundary.
 */

pub mod midi;
pub mod mixer;
pub mod model;
pub mod roll;
pub mod snapshot;
pub mod transport;
