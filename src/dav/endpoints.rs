use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const DAV_ROOT: &str = "remote.php/dav";

/// Name of the marker resource that triggers server-side assembly
pub const ASSEMBLY_MARKER: &str = ".file";

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// URL layout of a Nextcloud-style WebDAV server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavEndpoints {
    base_url: String,
    user_id: String,
}

impl DavEndpoints {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            user_id: user_id.into(),
        }
    }

    /// Root of the user's file tree
    pub fn files_root(&self) -> String {
        format!(
            "{}/{}/files/{}",
            self.base_url,
            DAV_ROOT,
            encode_segment(&self.user_id)
        )
    }

    /// Temporary collection holding the chunks of one upload
    pub fn staging_collection(&self, token: &str) -> String {
        format!(
            "{}/{}/uploads/{}/{}",
            self.base_url,
            DAV_ROOT,
            encode_segment(&self.user_id),
            encode_segment(token)
        )
    }

    pub fn chunk(&self, token: &str, chunk_name: &str) -> String {
        format!(
            "{}/{}",
            self.staging_collection(token),
            encode_segment(chunk_name)
        )
    }

    pub fn assembly_marker(&self, token: &str) -> String {
        format!("{}/{}", self.staging_collection(token), ASSEMBLY_MARKER)
    }

    /// Final location of `file_name` inside the server directory `server_dir`
    pub fn destination(&self, server_dir: &str, file_name: &str) -> String {
        format!(
            "{}{}/{}",
            self.files_root(),
            encode_path(server_dir),
            encode_segment(file_name)
        )
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Encode each segment, keep the separators; empty paths stay empty
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/{}", encode_segment(segment)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> DavEndpoints {
        DavEndpoints::new("https://cloud.example.com/", "alice")
    }

    #[test]
    fn test_staging_layout() {
        let e = endpoints();
        assert_eq!(
            e.staging_collection("tok"),
            "https://cloud.example.com/remote.php/dav/uploads/alice/tok"
        );
        assert_eq!(
            e.chunk("tok", "00001"),
            "https://cloud.example.com/remote.php/dav/uploads/alice/tok/00001"
        );
        assert_eq!(
            e.assembly_marker("tok"),
            "https://cloud.example.com/remote.php/dav/uploads/alice/tok/.file"
        );
    }

    #[test]
    fn test_destination_encodes_segments() {
        let e = endpoints();
        assert_eq!(
            e.destination("/Photos/2024 trip/", "big file.mov"),
            "https://cloud.example.com/remote.php/dav/files/alice/Photos/2024%20trip/big%20file.mov"
        );
    }

    #[test]
    fn test_destination_at_root() {
        let e = endpoints();
        assert_eq!(
            e.destination("", "a.bin"),
            "https://cloud.example.com/remote.php/dav/files/alice/a.bin"
        );
        assert_eq!(e.destination("/", "a.bin"), e.destination("", "a.bin"));
    }
}
