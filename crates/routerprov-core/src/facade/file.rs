// Device file storage.

use routerprov_api::Command;

use super::RouterFacade;
use crate::envelope::Outcome;
use crate::error::CoreError;

impl RouterFacade {
    /// Write `contents` to device storage as `name`.
    pub async fn upload_file(&self, name: &str, contents: &str) -> Outcome {
        self.run_once(
            Command::new("/file/add")
                .param("name", name)
                .param("contents", contents),
        )
        .await
        .into()
    }

    pub async fn remove_file(&self, name: &str) -> Outcome {
        self.run_once(Command::new("/file/remove").param("numbers", name))
            .await
            .into()
    }

    /// Contents of the device file `name`.
    pub async fn read_file(&self, name: &str) -> Result<String, CoreError> {
        let records = self
            .run_once(Command::new("/file/print").query("name", name))
            .await?;
        records
            .first()
            .and_then(|r| r.get("contents"))
            .map(str::to_owned)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "File".into(),
                identifier: name.into(),
            })
    }
}
